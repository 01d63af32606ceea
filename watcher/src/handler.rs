//! Application item handlers.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::hub::HubItem;

/// Error returned by an application handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives each item delivered on a watched channel.
///
/// Called with the fetched item content and the item's hub URI. Handlers must
/// finish in bounded time: the hub's acknowledgment waits on them.
pub trait ItemHandler: Send + Sync + 'static {
    fn handle(&self, item: HubItem, uri: String) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> ItemHandler for F
where
    F: Fn(HubItem, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, item: HubItem, uri: String) -> BoxFuture<'static, Result<(), HandlerError>> {
        self(item, uri).boxed()
    }
}
