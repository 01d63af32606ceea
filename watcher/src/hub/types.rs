//! Hub Types
//!
//! Webhook descriptors, notification payloads and fetched items.

use std::borrow::Cow;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Remote webhook (group callback) as stored by the hub.
///
/// Identity is `name`; the hub owns the resource, this crate only computes
/// the expected shape and compares it with what the hub reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDescriptor {
    #[serde(default)]
    pub name: String,
    pub channel_url: String,
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_calls: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_item: Option<String>,
}

/// Body of a hub notification POSTed to a callback route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationPayload {
    /// Name of the webhook that produced the notification
    #[serde(default)]
    pub name: Option<String>,
    /// Item URIs; exactly one is expected per notification
    pub uris: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl NotificationPayload {
    /// Decode a request body.
    ///
    /// Accepts the payload object itself or a JSON string holding the
    /// serialized object.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice::<serde_json::Value>(body)? {
            serde_json::Value::String(encoded) => serde_json::from_str(&encoded),
            value => serde_json::from_value(value),
        }
    }
}

/// Item content fetched from the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubItem {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HubItem {
    /// Decode the item body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Item body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
