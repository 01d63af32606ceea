//! Reusable test helpers for watcher integration tests.
//!
//! Provides [`FakeHub`], an in-memory [`HubClient`] that records every call,
//! and [`RecordingReporter`] for asserting on swallowed failures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http_body_util::BodyExt;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use hub_watcher::{
    CallbackError, CallbackRoutes, ChannelWatcher, Environment, ErrorReporter, HandlerError,
    HubClient, HubError, HubItem, WatcherConfig, WebhookDescriptor,
};

/// A call made against the fake hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCall {
    Get(String),
    Create(WebhookDescriptor),
    Delete(String),
    Item(String),
}

/// In-memory hub.
#[derive(Default)]
pub struct FakeHub {
    webhooks: Mutex<HashMap<String, WebhookDescriptor>>,
    items: Mutex<HashMap<String, HubItem>>,
    calls: Mutex<Vec<HubCall>>,
    lookup_status: Mutex<Option<u16>>,
    create_status: Mutex<Option<u16>>,
    delete_status: Mutex<Option<u16>>,
}

impl FakeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_webhook(&self, descriptor: WebhookDescriptor) {
        self.webhooks
            .lock()
            .unwrap()
            .insert(descriptor.name.clone(), descriptor);
    }

    pub fn put_item(&self, uri: &str, body: &'static str) {
        self.items.lock().unwrap().insert(
            uri.to_string(),
            HubItem {
                content_type: Some("application/json".into()),
                body: Bytes::from_static(body.as_bytes()),
            },
        );
    }

    /// Make webhook lookups fail with the given HTTP status.
    pub fn fail_lookups(&self, status: u16) {
        *self.lookup_status.lock().unwrap() = Some(status);
    }

    /// Make webhook creation fail with the given HTTP status.
    pub fn fail_creates(&self, status: u16) {
        *self.create_status.lock().unwrap() = Some(status);
    }

    /// Make webhook deletion fail with the given HTTP status.
    pub fn fail_deletes(&self, status: u16) {
        *self.delete_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn webhook(&self, name: &str) -> Option<WebhookDescriptor> {
        self.webhooks.lock().unwrap().get(name).cloned()
    }

    fn record(&self, call: HubCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Hub error for `status`, with `404` mapped the way the HTTP client maps it.
fn status_error(status: u16) -> HubError {
    if status == 404 {
        return HubError::NotFound;
    }
    HubError::Status {
        status,
        body: String::new(),
    }
}

impl HubClient for FakeHub {
    fn get_webhook<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<WebhookDescriptor, HubError>> {
        async move {
            self.record(HubCall::Get(name.to_string()));
            if let Some(status) = *self.lookup_status.lock().unwrap() {
                return Err(status_error(status));
            }
            self.webhook(name).ok_or(HubError::NotFound)
        }
        .boxed()
    }

    fn create_webhook<'a>(
        &'a self,
        descriptor: &'a WebhookDescriptor,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        async move {
            self.record(HubCall::Create(descriptor.clone()));
            if let Some(status) = *self.create_status.lock().unwrap() {
                return Err(status_error(status));
            }
            self.put_webhook(descriptor.clone());
            Ok(())
        }
        .boxed()
    }

    fn delete_webhook<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), HubError>> {
        async move {
            self.record(HubCall::Delete(name.to_string()));
            if let Some(status) = *self.delete_status.lock().unwrap() {
                return Err(status_error(status));
            }
            self.webhooks
                .lock()
                .unwrap()
                .remove(name)
                .map(|_| ())
                .ok_or(HubError::NotFound)
        }
        .boxed()
    }

    fn get_item<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<HubItem, HubError>> {
        async move {
            self.record(HubCall::Item(uri.to_string()));
            self.items
                .lock()
                .unwrap()
                .get(uri)
                .cloned()
                .ok_or(HubError::NotFound)
        }
        .boxed()
    }
}

/// Reporter that keeps every swallowed failure as a string.
#[derive(Default)]
pub struct RecordingReporter {
    pub reconcile: Mutex<Vec<String>>,
    pub callback: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reconcile_failures(&self) -> Vec<String> {
        self.reconcile.lock().unwrap().clone()
    }

    pub fn callback_failures(&self) -> Vec<String> {
        self.callback.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn reconcile_failed(&self, webhook: &str, error: &HubError) {
        self.reconcile
            .lock()
            .unwrap()
            .push(format!("{webhook}: {error}"));
    }

    fn callback_failed(&self, channel: &str, error: &CallbackError) {
        self.callback
            .lock()
            .unwrap()
            .push(format!("{channel}: {error}"));
    }
}

/// Development environment for user `alice`, so naming never scans interfaces.
pub fn dev_env() -> Environment {
    Environment {
        user: Some("alice".into()),
        ..Environment::named("development")
    }
}

/// Watcher wired to a fake hub and a fresh route table.
pub struct TestWatcher {
    pub watcher: ChannelWatcher,
    pub hub: Arc<FakeHub>,
    pub routes: CallbackRoutes,
    pub reporter: Arc<RecordingReporter>,
}

impl TestWatcher {
    pub fn new() -> Self {
        Self::with_config(WatcherConfig::default_for_test())
    }

    pub fn with_config(config: WatcherConfig) -> Self {
        Self::with_environment(config, dev_env())
    }

    pub fn with_environment(config: WatcherConfig, environment: Environment) -> Self {
        let hub = FakeHub::new();
        let routes = CallbackRoutes::new();
        let reporter = RecordingReporter::new();
        let watcher = ChannelWatcher::with_reporter(
            config,
            environment,
            hub.clone(),
            Arc::new(routes.clone()),
            reporter.clone(),
        )
        .expect("valid test config");

        Self {
            watcher,
            hub,
            routes,
            reporter,
        }
    }

    /// Send a request through the callback router.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.routes
            .router()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Build a hub notification POST for `channel`.
pub fn notification(channel: &str, body: impl Into<Body>) -> Request<Body> {
    Request::post(format!("/hub-callbacks/{channel}"))
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(resp: Response<Body>) -> Bytes {
    resp.into_body().collect().await.unwrap().to_bytes()
}

/// Handler that records each `(uri, body)` it receives.
pub fn recording_handler() -> (
    Arc<Mutex<Vec<(String, String)>>>,
    impl Fn(HubItem, String) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = move |item: HubItem, uri: String| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push((uri, item.text().into_owned()));
            Ok::<(), HandlerError>(())
        }
        .boxed()
    };
    (seen, handler)
}

/// A real HTTP server bound to a random local port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    _handle: JoinHandle<()>,
}

/// Serve `router` on a random port, for tests that need a real socket
/// (the reqwest hub client, for one).
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}
