//! Resolved connection settings for one controller

use std::fmt;

pub const DEFAULT_HOST: &str = "https://unifi.local";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password";
pub const DEFAULT_SITE: &str = "default";

/// Everything the controller client needs to log in and address a site
///
/// Built once by the front end and handed to [`crate::filters::ControllerClient::new`].
/// The password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub site: String,
    /// Verify the controller's TLS certificate (off by default for self-signed setups)
    pub verify_tls: bool,
}

impl ControllerConfig {
    /// Creates a configuration with TLS verification off
    ///
    /// # Arguments
    /// * `host` - Controller base URL; a trailing `/` is dropped
    /// * `username` / `password` - Local controller account
    /// * `site` - Site name, `default` on single-site controllers
    ///
    /// # Examples
    ///
    /// ```
    /// use unifi_filter_sync::config::ControllerConfig;
    ///
    /// let config = ControllerConfig::new("https://192.168.1.1/", "admin", "secret", "default")
    ///     .with_verify_tls(true);
    /// assert_eq!(config.login_url(), "https://192.168.1.1/api/auth/login");
    /// ```
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        let host: String = host.into();
        Self {
            host: host.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            site: site.into(),
            verify_tls: false,
        }
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/auth/login", self.host)
    }

    pub fn filters_url(&self) -> String {
        format!(
            "{}/proxy/network/v2/api/site/{}/content-filtering",
            self.host, self.site
        )
    }

    pub fn filter_url(&self, id: &str) -> String {
        format!("{}/{}", self.filters_url(), id)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_USERNAME, DEFAULT_PASSWORD, DEFAULT_SITE)
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site", &self.site)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}
