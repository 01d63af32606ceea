//! Best-effort Error Reporting
//!
//! Reconciliation and callback failures never propagate; they are handed to
//! an [`ErrorReporter`] instead. The default reporter logs through `tracing`.

use tracing::{error, warn};

use crate::callback::CallbackError;
use crate::hub::HubError;

/// Sink for failures the watcher swallows.
pub trait ErrorReporter: Send + Sync + 'static {
    /// A webhook could not be reconciled with the hub.
    fn reconcile_failed(&self, webhook: &str, error: &HubError);

    /// A notification on `channel` was acknowledged with a failure.
    fn callback_failed(&self, channel: &str, error: &CallbackError);
}

/// Reporter that logs failures with channel and webhook context.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn reconcile_failed(&self, webhook: &str, error: &HubError) {
        error!(
            webhook = %webhook,
            status = ?error.status(),
            error = %error,
            "Failed to reconcile hub webhook; channel stays unregistered with the hub"
        );
    }

    fn callback_failed(&self, channel: &str, error: &CallbackError) {
        match error {
            CallbackError::Handler { .. } | CallbackError::HandlerPanicked { .. } => {
                error!(channel = %channel, error = %error, "Item handler failed");
            }
            _ => {
                warn!(channel = %channel, error = %error, "Rejected hub notification");
            }
        }
    }
}
