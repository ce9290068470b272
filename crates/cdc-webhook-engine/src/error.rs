//! Delivery error types

use thiserror::Error;

/// Failure of a single delivery attempt.
///
/// Messages never include the webhook URL or header values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        DeliveryError::Transport(e.without_url().to_string())
    }
}
