//! Hub client errors.

use thiserror::Error;

/// Failure talking to the hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// The requested resource does not exist on the hub.
    #[error("Not found on hub")]
    NotFound,

    /// The hub answered with an unexpected status.
    #[error("Hub returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The request never completed.
    #[error("Hub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The hub's response body could not be decoded.
    #[error("Invalid hub response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HubError {
    /// Whether this error is the hub's not-found signal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// HTTP status reported by the hub, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}
