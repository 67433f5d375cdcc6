//! Authenticated controller session
//!
//! Logging in gives us two things: a session cookie (kept by reqwest's cookie
//! store and replayed automatically) and a CSRF token that must accompany every
//! state-changing request. The token normally arrives in the `X-CSRF-Token`
//! response header. Older controller builds only embed it in the `TOKEN`
//! cookie, a JWT whose payload carries a `csrfToken` claim, so we fall back to
//! decoding that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::{AuthFailure, Result, SyncError};

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const UPDATED_CSRF_HEADER: &str = "x-updated-csrf-token";
pub const SESSION_COOKIE: &str = "TOKEN";

const USER_AGENT: &str = concat!("unifi-filter-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Builds the HTTP client shared by every request of one invocation
///
/// Certificate verification follows `config.verify_tls`; it is disabled by
/// default because controllers ship with self-signed certificates.
pub fn build_client(config: &ControllerConfig) -> Result<Client> {
    ClientBuilder::new()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| SyncError::Api {
            status: None,
            message: format!("failed to create HTTP client: {}", e),
        })
}

/// Cookie-backed session plus the CSRF token captured at login
#[derive(Debug, Clone)]
pub struct ControllerSession {
    client: Client,
    csrf_token: Option<String>,
}

impl ControllerSession {
    /// Posts the credentials to `/api/auth/login` and captures the CSRF token
    ///
    /// # Errors
    /// * [`SyncError::Connection`] if the controller cannot be reached
    /// * [`SyncError::Auth`] with [`AuthFailure::Rejected`] on 401/403
    /// * [`SyncError::Auth`] with [`AuthFailure::MalformedResponse`] on any
    ///   other non-success status or a body that is not JSON
    pub async fn login(client: Client, config: &ControllerConfig) -> Result<Self> {
        let url = config.login_url();
        debug!("Logging in to {} as {}", url, config.username);

        let response = client
            .post(&url)
            .json(&LoginRequest {
                username: &config.username,
                password: &config.password,
            })
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::auth(
                AuthFailure::Rejected,
                format!(
                    "controller rejected the credentials for user '{}' (HTTP {})",
                    config.username, status
                ),
            ));
        }
        if !status.is_success() {
            return Err(SyncError::auth(
                AuthFailure::MalformedResponse,
                format!("login returned unexpected HTTP {}", status),
            ));
        }

        let header_token = header_value(response.headers(), CSRF_HEADER);
        let cookie_token = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .and_then(|c| csrf_from_jwt(c.value()));

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;
        serde_json::from_str::<serde_json::Value>(&body).map_err(|e| {
            SyncError::auth(
                AuthFailure::MalformedResponse,
                format!("login response is not JSON: {}", e),
            )
        })?;

        let csrf_token = header_token.or(cookie_token);
        if csrf_token.is_some() {
            info!("Logged in to controller (CSRF token acquired)");
        } else {
            warn!("Logged in to controller, but no CSRF token was issued; updates may be refused");
        }

        Ok(Self { client, csrf_token })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Adopts a rotated token if the controller sent one
    pub fn refresh_csrf(&mut self, headers: &HeaderMap) {
        if let Some(token) = header_value(headers, UPDATED_CSRF_HEADER) {
            debug!("Controller rotated the CSRF token");
            self.csrf_token = Some(token);
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Extracts the `csrfToken` claim from a JWT without verifying it
///
/// Returns `None` for anything that is not a three-part token with a JSON
/// payload carrying a string `csrfToken`.
pub fn csrf_from_jwt(token: &str) -> Option<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not decode session token payload: {}", e);
            return None;
        }
    };

    let claims: serde_json::Value = match serde_json::from_slice(&payload) {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not parse session token payload: {}", e);
            return None;
        }
    };

    claims
        .get("csrfToken")
        .and_then(|v| v.as_str())
        .map(String::from)
}
