//! Webhook Reconciliation
//!
//! Makes the hub's webhook for a channel match the locally expected
//! descriptor. The hub cannot change a webhook's callback URL in place, so a
//! stale webhook is deleted and recreated.

use std::sync::Arc;

use tracing::{debug, info};

use crate::hub::{HubClient, HubError, WebhookDescriptor};
use crate::report::ErrorReporter;

/// What a reconciliation run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The hub already had the expected callback URL.
    Unchanged,
    /// No webhook existed; one was created.
    Created,
    /// The webhook pointed elsewhere; it was deleted and recreated.
    Replaced,
    /// The hub could not be reconciled. The failure was reported, not raised.
    Failed,
}

/// Ensures hub webhooks exist and point at this process.
#[derive(Clone)]
pub struct Reconciler {
    hub: Arc<dyn HubClient>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Reconciler {
    pub fn new(hub: Arc<dyn HubClient>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { hub, reporter }
    }

    /// Bring the hub webhook named by `desired` in line with it.
    ///
    /// Never fails: hub errors are handed to the reporter and yield
    /// [`Reconciliation::Failed`], leaving the channel unregistered until the
    /// next run.
    pub async fn ensure(&self, desired: &WebhookDescriptor) -> Reconciliation {
        match self.try_ensure(desired).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.reporter.reconcile_failed(&desired.name, &e);
                Reconciliation::Failed
            }
        }
    }

    async fn try_ensure(&self, desired: &WebhookDescriptor) -> Result<Reconciliation, HubError> {
        match self.hub.get_webhook(&desired.name).await {
            Ok(existing) if existing.callback_url == desired.callback_url => {
                debug!(webhook = %desired.name, "Hub webhook already up to date");
                Ok(Reconciliation::Unchanged)
            }
            Ok(existing) => {
                info!(
                    webhook = %desired.name,
                    old_callback = %existing.callback_url,
                    new_callback = %desired.callback_url,
                    "Replacing hub webhook with new callback URL"
                );
                match self.hub.delete_webhook(&desired.name).await {
                    // Someone else removed it first; creating is still correct.
                    Ok(()) | Err(HubError::NotFound) => {}
                    Err(e) => return Err(e),
                }
                self.hub.create_webhook(desired).await?;
                Ok(Reconciliation::Replaced)
            }
            Err(HubError::NotFound) => {
                self.hub.create_webhook(desired).await?;
                info!(
                    webhook = %desired.name,
                    callback = %desired.callback_url,
                    "Created hub webhook"
                );
                Ok(Reconciliation::Created)
            }
            Err(e) => Err(e),
        }
    }
}
