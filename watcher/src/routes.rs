//! Callback Routes
//!
//! Naming rules for callback paths, callback URLs and hub webhook names, plus
//! the route table the watcher registers callback handlers on.

use std::net::IpAddr;
use std::sync::{Arc, LazyLock};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Router;
use dashmap::DashMap;
use regex::Regex;
use tower::ServiceExt;

use crate::address;
use crate::config::Environment;
use crate::error::WatcherError;

/// Path prefix under which every channel callback is mounted.
pub const CALLBACK_PREFIX: &str = "/hub-callbacks";

static DUPLICATE_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("valid regex"));

/// Local path the hub POSTs notifications for `channel` to.
///
/// ```
/// assert_eq!(
///     hub_watcher::routes::callback_route("wma_email_outbox"),
///     "/hub-callbacks/wma_email_outbox"
/// );
/// ```
pub fn callback_route(channel: &str) -> String {
    format!("{CALLBACK_PREFIX}/{channel}")
}

/// Hub URL identifying `channel`.
pub fn channel_url(hub_host: &str, channel: &str) -> String {
    format!("{}/channel/{channel}", hub_host.trim_end_matches('/'))
}

/// Externally reachable URL for the callback route of `channel`.
///
/// A `localhost` host is replaced with the resolved local address so the hub
/// can reach this process; the port is kept.
pub fn callback_url(
    channel: &str,
    app_host: &str,
    environment: &Environment,
) -> Result<String, WatcherError> {
    let host = app_host.trim().trim_end_matches('/');
    let raw = if host.contains("://") {
        format!("{host}{}", callback_route(channel))
    } else {
        format!("http://{host}{}", callback_route(channel))
    };

    let mut url =
        reqwest::Url::parse(&raw).map_err(|e| WatcherError::InvalidUrl(format!("{raw}: {e}")))?;

    if url.host_str() == Some("localhost") {
        let addr = address::resolve(environment)?;
        url.set_ip_host(IpAddr::V4(addr))
            .map_err(|()| WatcherError::InvalidUrl(format!("{raw}: cannot set host to {addr}")))?;
    }

    let path = DUPLICATE_SLASHES.replace_all(url.path(), "/").into_owned();
    url.set_path(&path);

    Ok(url.to_string())
}

/// Hub webhook name for this process.
///
/// Shared deployments use `{prefix}_{environment}`. Everywhere else the name
/// carries the operating user (or the local address with dots replaced) so
/// developers watching the same channel do not steal each other's webhook.
pub fn webhook_name(prefix: &str, environment: &Environment) -> Result<String, WatcherError> {
    if environment.is_deployed() {
        return Ok(format!("{prefix}_{}", environment.name));
    }

    let owner = match &environment.user {
        Some(user) => user.clone(),
        None => address::resolve(environment)?.to_string().replace('.', "_"),
    };
    Ok(format!("{prefix}_{owner}_{}", environment.name))
}

/// Host server capability: register a handler for a path.
pub trait RouteHost: Send + Sync + 'static {
    /// Register `route` at `path`. Registering a path again replaces it.
    fn register(&self, path: &str, route: MethodRouter);
}

/// Route table collecting callback handlers for an axum server.
#[derive(Clone, Default)]
pub struct CallbackRoutes {
    routes: Arc<DashMap<String, MethodRouter>>,
}

impl CallbackRoutes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Build a router serving the callback table.
    ///
    /// Requests are matched against the table when they arrive, so routes
    /// registered (or replaced) after this call are served too. Unknown paths
    /// get `404`.
    pub fn router(&self) -> Router {
        let routes = Arc::clone(&self.routes);
        Router::new().fallback(move |request: Request| {
            let routes = Arc::clone(&routes);
            async move { dispatch(&routes, request).await }
        })
    }
}

async fn dispatch(routes: &DashMap<String, MethodRouter>, request: Request) -> Response {
    // Clone out of the map so no shard lock is held across the handler.
    let route = routes
        .get(request.uri().path())
        .map(|entry| entry.value().clone());

    match route {
        Some(route) => match route.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl RouteHost for CallbackRoutes {
    fn register(&self, path: &str, route: MethodRouter) {
        self.routes.insert(path.to_string(), route);
    }
}
