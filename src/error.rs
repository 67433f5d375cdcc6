//! Error kinds surfaced by the controller client and the filter file codec
//!
//! Every failure is reported once, on stderr, and maps to a non-zero exit
//! status. None of the variants ever carry the controller password.
//! Underlying causes are kept as `source`, so print with `{:#}` through
//! anyhow to see the whole chain.

use std::path::PathBuf;
use thiserror::Error;

/// Longest response body excerpt kept in an [`SyncError::Api`] message
const BODY_EXCERPT_LEN: usize = 200;

/// Why an authentication step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Controller answered the login request with 401 or 403
    Rejected,
    /// Login succeeded at the HTTP level but the body was not what we expect
    MalformedResponse,
    /// A state-changing request was refused, usually a missing or stale CSRF token
    Forbidden,
    /// A repository call was made before `login`
    NotLoggedIn,
}

/// Errors produced while talking to the controller or the local filesystem
#[derive(Debug, Error)]
pub enum SyncError {
    /// Controller could not be reached at all
    #[error("could not connect to controller at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Credentials rejected, login response unusable, or CSRF check failed
    #[error("authentication failed: {message}")]
    Auth { kind: AuthFailure, message: String },

    /// No filter (or more than one) carries the requested name
    #[error("{0}")]
    NotFound(String),

    /// Unexpected HTTP status or body shape on list/update
    #[error("controller API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Local filter file could not be read or written
    #[error("{action} '{}'", .path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn auth(kind: AuthFailure, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            message: message.into(),
        }
    }

    /// Builds an [`SyncError::Api`] from a non-success status and the response body
    pub fn status(status: reqwest::StatusCode, context: &str, body: &str) -> Self {
        let excerpt: String = body.trim().chars().take(BODY_EXCERPT_LEN).collect();
        let message = if excerpt.is_empty() {
            format!("{} returned HTTP {}", context, status)
        } else {
            format!("{} returned HTTP {}: {}", context, status, excerpt)
        };
        Self::Api {
            status: Some(status.as_u16()),
            message,
        }
    }

    /// Builds an [`SyncError::Api`] for a body that did not have the expected shape
    pub fn shape(context: &str, detail: impl std::fmt::Display) -> Self {
        Self::Api {
            status: None,
            message: format!("unexpected response from {}: {}", context, detail),
        }
    }

    /// Classifies a transport-level reqwest failure
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_connect() || source.is_timeout() {
            Self::Connection {
                url: url.to_string(),
                source,
            }
        } else {
            Self::Api {
                status: source.status().map(|s| s.as_u16()),
                message: format!("request to {} failed: {}", url, source),
            }
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "ConnectionError",
            Self::Auth { .. } => "AuthError",
            Self::NotFound(_) => "NotFound",
            Self::Api { .. } => "ApiError",
            Self::File { .. } => "FileError",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
