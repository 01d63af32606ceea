//! Watcher Error Types
//!
//! Fatal errors raised while constructing the watcher or registering a
//! channel. Per-notification and reconciliation failures are not represented
//! here; they are reported and swallowed by their own components.

use thiserror::Error;

/// Errors that prevent the watcher from functioning.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No routable local IPv4 address could be found.
    #[error("No usable local network address found; set LOCAL_IP_ADDRESS")]
    AddressUnavailable,

    /// A callback or hub URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The hub HTTP client could not be constructed.
    #[error("Hub client error: {0}")]
    Client(#[from] reqwest::Error),
}
