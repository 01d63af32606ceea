//! Event Hub Boundary
//!
//! Types exchanged with the remote hub and the client used to manage
//! webhooks and fetch item content.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpHubClient, HubClient};
pub use error::HubError;
pub use types::{HubItem, NotificationPayload, WebhookDescriptor};
