//! Hub Watcher - Main Entry Point
//!
//! Watches the channels listed in `WATCH_CHANNELS` and logs every item the
//! hub delivers.

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing::info;

use hub_watcher::{ChannelWatcher, Environment, HandlerError, HubItem, WatcherConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_watcher=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = WatcherConfig::from_env()?;
    let environment = Environment::from_env();
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let channels: Vec<String> = std::env::var("WATCH_CHANNELS")
        .context("WATCH_CHANNELS must be set")?
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %environment.name,
        "Starting Hub Watcher"
    );

    let (watcher, routes) = ChannelWatcher::over_http(config, environment)?;
    for channel in &channels {
        watcher.watch_channel(channel, log_item).await?;
    }

    let app = routes.router().layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, channels = ?watcher.watched_channels(), "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal, stopping...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn log_item(item: HubItem, uri: String) -> Result<(), HandlerError> {
    info!(
        uri = %uri,
        content_type = ?item.content_type,
        bytes = item.body.len(),
        "Received hub item"
    );
    Ok(())
}
