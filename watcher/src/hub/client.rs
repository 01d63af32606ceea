//! Hub HTTP Client
//!
//! [`HubClient`] is the seam the reconciler and callback pipeline depend on;
//! [`HttpHubClient`] implements it against the hub's REST API.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use super::error::HubError;
use super::types::{HubItem, WebhookDescriptor};
use crate::config::HubClientOptions;
use crate::error::WatcherError;

/// Operations the watcher needs from the hub.
pub trait HubClient: Send + Sync + 'static {
    /// Fetch a webhook by name. Missing webhooks yield [`HubError::NotFound`].
    fn get_webhook<'a>(&'a self, name: &'a str)
        -> BoxFuture<'a, Result<WebhookDescriptor, HubError>>;

    /// Create a webhook from the descriptor.
    fn create_webhook<'a>(
        &'a self,
        descriptor: &'a WebhookDescriptor,
    ) -> BoxFuture<'a, Result<(), HubError>>;

    /// Delete a webhook by name.
    fn delete_webhook<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), HubError>>;

    /// Fetch the content of the item at `uri`.
    fn get_item<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<HubItem, HubError>>;
}

/// [`HubClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpHubClient {
    /// Build a client for the hub at `base_url`, applying pass-through options.
    pub fn new(base_url: &str, options: &HubClientOptions) -> Result<Self, WatcherError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| WatcherError::Config(format!("invalid hub header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| WatcherError::Config(format!("invalid value for hub header {name}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Hub base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn webhook_url(&self, name: &str) -> String {
        format!("{}/webhook/{name}", self.base_url)
    }
}

/// Map non-success statuses to [`HubError`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, HubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 404 {
        return Err(HubError::NotFound);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(HubError::Status {
        status: status.as_u16(),
        body,
    })
}

impl HubClient for HttpHubClient {
    fn get_webhook<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<WebhookDescriptor, HubError>> {
        async move {
            let resp = self.http.get(self.webhook_url(name)).send().await?;
            let bytes = check_status(resp).await?.bytes().await?;
            let mut descriptor: WebhookDescriptor = serde_json::from_slice(&bytes)?;
            if descriptor.name.is_empty() {
                descriptor.name = name.to_string();
            }
            Ok(descriptor)
        }
        .boxed()
    }

    fn create_webhook<'a>(
        &'a self,
        descriptor: &'a WebhookDescriptor,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        async move {
            let resp = self
                .http
                .put(self.webhook_url(&descriptor.name))
                .json(descriptor)
                .send()
                .await?;
            check_status(resp).await?;
            debug!(callback_url = %descriptor.callback_url, "Created hub webhook");
            Ok(())
        }
        .boxed()
    }

    fn delete_webhook<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), HubError>> {
        async move {
            let resp = self.http.delete(self.webhook_url(name)).send().await?;
            check_status(resp).await?;
            Ok(())
        }
        .boxed()
    }

    fn get_item<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<HubItem, HubError>> {
        async move {
            let resp = check_status(self.http.get(uri).send().await?).await?;
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.bytes().await?;
            Ok(HubItem { content_type, body })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn webhook_url_strips_trailing_slash() {
        let client = HttpHubClient::new("http://hub.test/", &HubClientOptions::default()).unwrap();
        assert_eq!(client.base_url(), "http://hub.test");
        assert_eq!(
            client.webhook_url("orders_production"),
            "http://hub.test/webhook/orders_production"
        );
    }

    #[test]
    fn accepts_pass_through_options() {
        let options = HubClientOptions {
            timeout: Some(Duration::from_secs(5)),
            headers: BTreeMap::from([("X-Api-Key".to_string(), "secret".to_string())]),
        };
        assert!(HttpHubClient::new("http://hub.test", &options).is_ok());
    }

    #[test]
    fn rejects_invalid_header() {
        let options = HubClientOptions {
            timeout: None,
            headers: BTreeMap::from([("bad header".to_string(), "v".to_string())]),
        };
        let err = HttpHubClient::new("http://hub.test", &options).unwrap_err();
        assert!(matches!(err, WatcherError::Config(_)));
    }
}
