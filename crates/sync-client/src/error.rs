//! Error types for the sync API client.
//!
//! Everything surfaced here is transport-level: the network was unreachable,
//! the server answered outside 2xx, or the body did not decode. Per-mutation
//! rejections ride inside a successful [`crate::PushResponse`] instead.

use thiserror::Error;

/// Result type alias for sync API operations.
pub type Result<T> = std::result::Result<T, SyncApiError>;

/// Errors that can occur talking to the sync endpoints.
#[derive(Debug, Error)]
pub enum SyncApiError {
    /// HTTP client error (DNS, connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response or undecodable body
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl SyncApiError {
    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(_) => None,
        }
    }
}
