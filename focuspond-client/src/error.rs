//! Remote client error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for remote calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true if the call exceeded its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Timeout(_) => true,
            ClientError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if retrying the same call later may succeed.
    ///
    /// Connection failures, timeouts, 5xx, 408 and 429 are transient. Other
    /// 4xx responses, decode failures and configuration errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::Timeout(_) => true,
            ClientError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            ClientError::Serialization(_) | ClientError::Config(_) => false,
        }
    }

    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
