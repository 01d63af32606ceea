//! Hub Callback Pipeline
//!
//! Handles one hub notification: decode the body, fetch the referenced item,
//! run the channel's handler and acknowledge with `200` or `422`. Every
//! request gets exactly one response; failures are reported, never raised.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

use crate::handler::{HandlerError, ItemHandler};
use crate::hub::{HubClient, HubError, NotificationPayload};
use crate::report::ErrorReporter;

/// Content type the hub expects on acknowledgments.
const ACK_CONTENT_TYPE: &str = "text/json";

/// Largest notification body accepted. Notifications carry item URIs, not
/// item content.
pub const MAX_NOTIFICATION_BYTES: usize = 1024 * 1024;

/// Why a notification was acknowledged with a failure.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Failed to read notification body: {0}")]
    Body(#[from] BytesRejection),

    #[error("Invalid notification body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Expected exactly one item URI, got {0}")]
    UriCount(usize),

    #[error("Failed to fetch item {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: HubError,
    },

    #[error("Handler for channel {channel} failed: {source}")]
    Handler {
        channel: String,
        #[source]
        source: HandlerError,
    },

    #[error("Handler for channel {channel} panicked")]
    HandlerPanicked { channel: String },
}

/// Notification processing bound to one channel.
#[derive(Clone)]
pub struct CallbackPipeline {
    channel: Arc<str>,
    hub: Arc<dyn HubClient>,
    handler: Arc<dyn ItemHandler>,
    reporter: Arc<dyn ErrorReporter>,
}

impl CallbackPipeline {
    pub fn new(
        channel: &str,
        hub: Arc<dyn HubClient>,
        handler: Arc<dyn ItemHandler>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            channel: Arc::from(channel),
            hub,
            handler,
            reporter,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Run a notification body through decode, fetch and dispatch.
    ///
    /// The URI count is checked before fetching so a malformed notification
    /// never reaches the hub or the handler.
    pub async fn process(&self, body: &[u8]) -> Result<(), CallbackError> {
        let payload = NotificationPayload::from_body(body)?;

        let uri = match payload.uris.as_slice() {
            [uri] => uri.clone(),
            uris => return Err(CallbackError::UriCount(uris.len())),
        };

        let item = self
            .hub
            .get_item(&uri)
            .await
            .map_err(|source| CallbackError::Fetch {
                uri: uri.clone(),
                source,
            })?;

        // Run the handler on its own task so a panic is contained to this notification.
        let handler = Arc::clone(&self.handler);
        let dispatched = tokio::spawn(async move { handler.handle(item, uri).await }).await;

        match dispatched {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(CallbackError::Handler {
                channel: self.channel.to_string(),
                source,
            }),
            Err(_) => Err(CallbackError::HandlerPanicked {
                channel: self.channel.to_string(),
            }),
        }
    }

    /// Process a notification and pick the acknowledgment status.
    pub async fn acknowledge(&self, body: &[u8]) -> StatusCode {
        let outcome = self.process(body).await;
        self.settle(outcome)
    }

    fn settle(&self, outcome: Result<(), CallbackError>) -> StatusCode {
        match outcome {
            Ok(()) => {
                debug!("Hub notification processed");
                StatusCode::OK
            }
            Err(e) => {
                self.reporter.callback_failed(&self.channel, &e);
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// axum route answering hub POSTs for this channel.
    ///
    /// Body read failures (including bodies over [`MAX_NOTIFICATION_BYTES`])
    /// are acknowledged like any other failure, so the hub only sees `200`
    /// or `422`.
    pub fn into_route(self) -> MethodRouter {
        post(move |body: Result<Bytes, BytesRejection>| {
            let pipeline = self.clone();
            async move {
                let span = info_span!("hub_callback", channel = %pipeline.channel);
                let status = match body {
                    Ok(body) => pipeline.acknowledge(&body).instrument(span).await,
                    Err(rejection) => span.in_scope(|| pipeline.settle(Err(rejection.into()))),
                };
                ack_response(status)
            }
        })
        .layer(DefaultBodyLimit::max(MAX_NOTIFICATION_BYTES))
    }
}

fn ack_response(status: StatusCode) -> Response {
    (status, [(header::CONTENT_TYPE, ACK_CONTENT_TYPE)]).into_response()
}
