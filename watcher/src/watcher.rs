//! Channel Watcher
//!
//! Entry point for applications: `watch_channel` mounts the channel's
//! callback route on the host server and, the first time a channel is seen,
//! reconciles its hub webhook.

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, info};

use crate::callback::CallbackPipeline;
use crate::config::{Environment, WatcherConfig};
use crate::error::WatcherError;
use crate::handler::ItemHandler;
use crate::hub::{HttpHubClient, HubClient, WebhookDescriptor};
use crate::reconcile::Reconciler;
use crate::report::{ErrorReporter, TracingReporter};
use crate::routes::{self, CallbackRoutes, RouteHost};

/// Watches hub channels on behalf of an HTTP server.
pub struct ChannelWatcher {
    config: WatcherConfig,
    environment: Environment,
    hub: Arc<dyn HubClient>,
    host: Arc<dyn RouteHost>,
    reporter: Arc<dyn ErrorReporter>,
    reconciler: Reconciler,
    watched: DashSet<String>,
}

impl ChannelWatcher {
    /// Create a watcher that logs swallowed failures through `tracing`.
    ///
    /// Fails if the configuration is incomplete for `environment`.
    pub fn new(
        config: WatcherConfig,
        environment: Environment,
        hub: Arc<dyn HubClient>,
        host: Arc<dyn RouteHost>,
    ) -> Result<Self, WatcherError> {
        Self::with_reporter(config, environment, hub, host, Arc::new(TracingReporter))
    }

    /// Create a watcher with a custom reporter for swallowed failures.
    pub fn with_reporter(
        config: WatcherConfig,
        environment: Environment,
        hub: Arc<dyn HubClient>,
        host: Arc<dyn RouteHost>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, WatcherError> {
        config.validate(&environment)?;

        let reconciler = Reconciler::new(Arc::clone(&hub), Arc::clone(&reporter));
        Ok(Self {
            config,
            environment,
            hub,
            host,
            reporter,
            reconciler,
            watched: DashSet::new(),
        })
    }

    /// Create a watcher talking to the configured hub over HTTP, with its
    /// callbacks collected in a fresh [`CallbackRoutes`] table.
    pub fn over_http(
        config: WatcherConfig,
        environment: Environment,
    ) -> Result<(Self, CallbackRoutes), WatcherError> {
        config.validate(&environment)?;
        let hub = HttpHubClient::new(config.hub_host(&environment)?, &config.client)?;
        let routes = CallbackRoutes::new();
        let watcher = Self::new(config, environment, Arc::new(hub), Arc::new(routes.clone()))?;
        Ok((watcher, routes))
    }

    /// Watch `channel`, delivering each of its items to `handler`.
    ///
    /// The callback route is registered on every call. Webhook reconciliation
    /// runs only the first time a channel is watched; its failures are
    /// reported and do not fail this call. Naming and address failures do.
    pub async fn watch_channel<H: ItemHandler>(
        &self,
        channel: &str,
        handler: H,
    ) -> Result<(), WatcherError> {
        let pipeline = CallbackPipeline::new(
            channel,
            Arc::clone(&self.hub),
            Arc::new(handler),
            Arc::clone(&self.reporter),
        );
        self.host
            .register(&routes::callback_route(channel), pipeline.into_route());

        if self.watched.contains(channel) {
            debug!(channel = %channel, "Channel already watched, route re-registered");
            return Ok(());
        }

        let descriptor = self.descriptor(channel)?;
        let outcome = self.reconciler.ensure(&descriptor).await;
        self.watched.insert(channel.to_string());

        info!(
            channel = %channel,
            webhook = %descriptor.name,
            callback = %descriptor.callback_url,
            outcome = ?outcome,
            "Watching hub channel"
        );
        Ok(())
    }

    /// Webhook this process expects the hub to hold for `channel`.
    ///
    /// The naming prefix is `{webhook_prefix}_{channel}` rather than the bare
    /// configured prefix, so every channel gets its own webhook: prefix
    /// `test`, channel `orders` and user `alice` in development give
    /// `test_orders_alice_development`. With the bare prefix, every channel
    /// watched by one process would share one hub webhook and each
    /// reconciliation would overwrite the previous channel's callback.
    pub fn descriptor(&self, channel: &str) -> Result<WebhookDescriptor, WatcherError> {
        let hub_host = self.config.hub_host(&self.environment)?;
        let app_host = self.config.app_host(&self.environment)?;
        let prefix = format!("{}_{channel}", self.config.webhook_prefix);

        Ok(WebhookDescriptor {
            name: routes::webhook_name(&prefix, &self.environment)?,
            channel_url: routes::channel_url(hub_host, channel),
            callback_url: routes::callback_url(channel, app_host, &self.environment)?,
            parallel_calls: self.config.parallel_calls,
            start_item: self.config.start_item.clone(),
        })
    }

    pub fn is_watched(&self, channel: &str) -> bool {
        self.watched.contains(channel)
    }

    /// Names of watched channels, sorted.
    pub fn watched_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.watched.iter().map(|c| c.key().clone()).collect();
        channels.sort();
        channels
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}
