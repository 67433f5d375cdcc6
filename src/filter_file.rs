//! Flat text format for domain block lists
//!
//! One domain per line. Blank lines and lines whose first non-whitespace
//! character is `#` are ignored on read. On write a short comment header is
//! emitted, followed by the domains in the order given. Entries are opaque
//! strings: no sorting, deduplication or syntax checks in either direction.

use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, SyncError};

/// Parses filter file text into domains, preserving order and duplicates
///
/// # Examples
///
/// ```
/// use unifi_filter_sync::filter_file::read;
///
/// let domains = read("# comment\n\nexample.com\n  \nfoo.net\n");
/// assert_eq!(domains, vec!["example.com", "foo.net"]);
/// ```
pub fn read(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Renders domains under a header naming the source filter
///
/// # Arguments
/// * `filter_name` - Name written into the first header line
/// * `domains` - Entries emitted one per line, in the given order
///
/// # Returns
/// * `String` - Text that [`read`] turns back into `domains`, as long as no
///   entry is blank or starts with `#`
pub fn write(filter_name: &str, domains: &[String]) -> String {
    let mut out = String::with_capacity(128 + domains.iter().map(|d| d.len() + 1).sum::<usize>());
    out.push_str(&format!("# {}\n", filter_name));
    out.push_str("# Lines starting with '#' are comments\n");
    out.push_str("# Edit this file and run 'sync' to update the controller\n\n");
    for domain in domains {
        out.push_str(domain);
        out.push('\n');
    }
    out
}

/// Reads and parses a filter file from disk
pub async fn read_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).await.map_err(|source| SyncError::File {
        action: "failed to read filter file",
        path: path.to_path_buf(),
        source,
    })?;
    let domains = read(&text);
    info!("Read {} domains from {}", domains.len(), path.display());
    Ok(domains)
}

/// Writes domains to disk in filter file format, replacing any existing file
pub async fn write_file(path: &Path, filter_name: &str, domains: &[String]) -> Result<()> {
    fs::write(path, write(filter_name, domains))
        .await
        .map_err(|source| SyncError::File {
            action: "failed to write filter file",
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote {} domains to {}", domains.len(), path.display());
    Ok(())
}
