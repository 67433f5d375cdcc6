//! Command-line interface for unifi-filter-sync
//!
//! Two subcommands move a content filter's domain block list between the
//! controller and a local text file:
//!
//! - `fetch <name> [-o FILE]` prints (or saves) the filter's domains
//! - `sync <name> FILE` pushes the file's domains to the filter
//!
//! Connection settings come from flags, falling back to `UNIFI_*` environment
//! variables and then to built-in defaults. Progress goes to stderr; stdout
//! carries only the domain list so `fetch` can be piped.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    ControllerConfig, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_SITE, DEFAULT_USERNAME,
};

const EXAMPLES: &str = "\
Examples:
  # Fetch filter and output to stdout
  unifi-filter-sync fetch \"Samsung Adblock\"

  # Fetch filter and save to file
  unifi-filter-sync fetch \"Samsung Adblock\" -o filters.txt

  # Sync filters from file to the controller
  unifi-filter-sync sync \"Samsung Adblock\" filters.txt";

/// Top-level arguments
///
/// Connection options are global so they may appear before or after the
/// subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "unifi-filter-sync",
    about = "Sync content filters between a text file and a UniFi controller",
    version,
    after_help = EXAMPLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Controller base URL
    #[arg(long, env = "UNIFI_HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,

    /// Controller username
    #[arg(long, env = "UNIFI_USERNAME", default_value = DEFAULT_USERNAME, global = true)]
    pub username: String,

    /// Controller password
    #[arg(
        long,
        env = "UNIFI_PASSWORD",
        default_value = DEFAULT_PASSWORD,
        hide_env_values = true,
        hide_default_value = true,
        global = true
    )]
    pub password: String,

    /// Site name the filter lives in
    #[arg(long, env = "UNIFI_SITE", default_value = DEFAULT_SITE, global = true)]
    pub site: String,

    /// Verify the controller's TLS certificate (self-signed certificates are accepted otherwise)
    ///
    /// `UNIFI_VERIFY_TLS` accepts true/false, yes/no, on/off and 1/0.
    #[arg(
        long,
        env = "UNIFI_VERIFY_TLS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub verify_tls: bool,
}

impl Cli {
    /// Resolves the connection settings handed to the controller client
    ///
    /// # Returns
    /// * `ControllerConfig` - Host (trailing `/` removed), credentials, site and TLS policy
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::new(&self.host, &self.username, &self.password, &self.site)
            .with_verify_tls(self.verify_tls)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Fetch filters from the controller
    Fetch {
        /// Name of the content filter on the controller
        filter_name: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sync filters from a file to the controller
    Sync {
        /// Name of the content filter on the controller
        filter_name: String,

        /// File containing filter domains
        file: PathBuf,
    },
}
