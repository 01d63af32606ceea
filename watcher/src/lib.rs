//! Hub Watcher
//!
//! Subscribes an axum server to event hub channels through webhooks: the hub
//! pushes a notification per item to a local callback route, the item is
//! fetched from the hub and handed to an application handler.

pub mod address;
pub mod callback;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod reconcile;
pub mod report;
pub mod routes;
pub mod watcher;

pub use callback::{CallbackError, CallbackPipeline};
pub use config::{EnvValue, Environment, HubClientOptions, WatcherConfig};
pub use error::WatcherError;
pub use handler::{HandlerError, ItemHandler};
pub use hub::{HttpHubClient, HubClient, HubError, HubItem, NotificationPayload, WebhookDescriptor};
pub use reconcile::{Reconciler, Reconciliation};
pub use report::{ErrorReporter, TracingReporter};
pub use routes::{CallbackRoutes, RouteHost};
pub use watcher::ChannelWatcher;
