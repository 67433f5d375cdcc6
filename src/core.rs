//! Fetch and sync workflows
//!
//! [`FilterSync`] wires the controller API to the filter file codec:
//!
//! - `fetch`: login, list, find by name, render the block list
//! - `sync`: login, read the file, list, find by name, push the new list
//!
//! Each workflow issues at most one login, one list and one update request,
//! strictly in sequence. Nothing is retried and an update is never re-read to
//! confirm it; run `fetch` again for that.

use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::cli::Commands;
use crate::error::{Result, SyncError};
use crate::filter_file;
use crate::filters::{find_filter, FilterApi};

/// Runs fetch/sync against any [`FilterApi`] implementation
///
/// # Examples
///
/// ```no_run
/// use unifi_filter_sync::config::ControllerConfig;
/// use unifi_filter_sync::core::FilterSync;
/// use unifi_filter_sync::filters::ControllerClient;
///
/// # async fn example() -> unifi_filter_sync::error::Result<()> {
/// let client = ControllerClient::new(ControllerConfig::default())?;
/// let mut sync = FilterSync::new(client);
/// let domains = sync.fetch("Samsung Adblock").await?;
/// println!("{} domains", domains.len());
/// # Ok(())
/// # }
/// ```
pub struct FilterSync<A> {
    api: A,
}

impl<A: FilterApi> FilterSync<A> {
    /// Wraps a controller API; no request is made until a workflow runs
    ///
    /// # Arguments
    /// * `api` - A [`crate::filters::ControllerClient`] in production, or any
    ///   other [`FilterApi`] implementation
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn into_api(self) -> A {
        self.api
    }

    /// Dispatches a parsed subcommand; `stdout` receives only domain text
    pub async fn run<W: Write>(&mut self, command: &Commands, stdout: &mut W) -> Result<()> {
        match command {
            Commands::Fetch {
                filter_name,
                output,
            } => self.fetch_to(filter_name, output.as_deref(), stdout).await,
            Commands::Sync { filter_name, file } => {
                self.sync(filter_name, file).await.map(|_| ())
            }
        }
    }

    /// Logs in and returns the named filter's block list in controller order
    ///
    /// # Arguments
    /// * `filter_name` - Exact, case-sensitive filter name
    ///
    /// # Returns
    /// * `Result<Vec<String>>` - The block list, or the first error hit
    ///   (auth, connection, API, or [`SyncError::NotFound`])
    pub async fn fetch(&mut self, filter_name: &str) -> Result<Vec<String>> {
        self.api.login().await?;

        let filters = self.api.list_filters().await?;
        let filter = find_filter(&filters, filter_name)?;
        info!("Found filter '{}' ({})", filter.name(), filter.id());
        info!(
            "Fetched {} domains from the controller",
            filter.block_list().len()
        );
        Ok(filter.block_list().to_vec())
    }

    /// Fetches and renders the filter to `output`, or to `stdout` when no path is given
    ///
    /// On failure nothing is written to either destination.
    pub async fn fetch_to<W: Write>(
        &mut self,
        filter_name: &str,
        output: Option<&Path>,
        stdout: &mut W,
    ) -> Result<()> {
        let domains = self.fetch(filter_name).await?;

        match output {
            Some(path) => filter_file::write_file(path, filter_name, &domains).await,
            None => {
                let text = filter_file::write(filter_name, &domains);
                stdout
                    .write_all(text.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|source| SyncError::File {
                        action: "failed to write to",
                        path: "<stdout>".into(),
                        source,
                    })
            }
        }
    }

    /// Logs in, reads `path` and replaces the named filter's block list with its contents
    ///
    /// An empty file (only comments or blank lines) clears the block list.
    /// The file is read after login and before the filter list is requested,
    /// so a missing file never leads to an update.
    ///
    /// # Arguments
    /// * `filter_name` - Exact, case-sensitive filter name
    /// * `path` - Filter file to read
    ///
    /// # Returns
    /// * `Result<usize>` - Number of domains pushed
    pub async fn sync(&mut self, filter_name: &str, path: &Path) -> Result<usize> {
        self.api.login().await?;
        let domains = filter_file::read_file(path).await?;
        self.push(filter_name, domains).await
    }

    /// Replaces the named filter's block list on an already logged-in API
    pub async fn push(&mut self, filter_name: &str, domains: Vec<String>) -> Result<usize> {
        let filters = self.api.list_filters().await?;
        let filter = find_filter(&filters, filter_name)?;
        info!("Found filter '{}' ({})", filter.name(), filter.id());

        let count = domains.len();
        let updated = filter.with_block_list(domains);
        self.api.update_filter(&updated).await?;
        info!("Synced {} domains to filter '{}'", count, filter_name);
        Ok(count)
    }
}
