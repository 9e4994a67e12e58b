use serde::Serialize;
use thiserror::Error;

use crate::decrypt::DecodeError;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum YfError {
    /// The request never produced an HTTP response (connect failure, timeout, reset).
    #[error("network error at {url}: {message}")]
    Network {
        /// The URL that was being requested.
        url: String,
        /// A description of the underlying failure.
        message: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },

    /// An error occurred while constructing or driving the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned an unsuccessful HTTP status code after retries were exhausted.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// The cookie/crumb handshake failed or the crumb was rejected after a refresh.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body could not be decoded into JSON.
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The decoded JSON did not have the shape expected for the requested category.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// The caller supplied an input that can never succeed (empty ticker, unknown category, bad range).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Reading or writing the on-disk cache failed.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a per-ticker failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No HTTP response could be obtained.
    Network,
    /// Upstream kept answering with an error status.
    Http,
    /// Cookie/crumb authentication could not be established.
    Auth,
    /// The body could not be decrypted or parsed.
    Decode,
    /// The decoded JSON was unusable.
    Schema,
}

/// The error marker stored in a [`crate::ResultSet`] for a ticker whose fetch failed.
///
/// Unlike [`YfError`] this is cheap to clone and serialize, so the result set
/// stays a plain value once the batch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// The HTTP status, when the failure was a status error.
    pub status: Option<u16>,
    /// Human readable description of the failure.
    pub message: String,
}

impl From<&YfError> for FetchFailure {
    fn from(e: &YfError) -> Self {
        let (kind, status) = match e {
            YfError::Network { .. } | YfError::Http(_) => (FailureKind::Network, None),
            YfError::Status { status, .. } => (FailureKind::Http, Some(*status)),
            YfError::Auth(_) => (FailureKind::Auth, None),
            YfError::Decode(_) => (FailureKind::Decode, None),
            YfError::Schema(_) | YfError::InvalidInput(_) | YfError::Url(_) | YfError::Io(_) => {
                (FailureKind::Schema, None)
            }
        };
        Self {
            kind,
            status,
            message: e.to_string(),
        }
    }
}
