//! Watcher Configuration
//!
//! Loads configuration from environment variables.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::WatcherError;

/// Environment name used when `APP_ENV` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Deployment context derived from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Deployment environment name (e.g., "development", "production")
    pub name: String,

    /// Operating user, used to disambiguate webhook names outside deployments
    pub user: Option<String>,

    /// Explicit local IP address, bypassing interface enumeration
    pub local_ip_override: Option<String>,
}

impl Environment {
    /// Read the deployment context from `APP_ENV`, `USER` and `LOCAL_IP_ADDRESS`.
    pub fn from_env() -> Self {
        Self {
            name: env::var("APP_ENV")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.into()),
            user: env::var("USER").ok().filter(|v| !v.is_empty()),
            local_ip_override: env::var("LOCAL_IP_ADDRESS").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Create an environment with the given name and no user or override.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user: None,
            local_ip_override: None,
        }
    }

    /// Whether this is a shared deployment (staging or production).
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        matches!(self.name.as_str(), "staging" | "production")
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.name == DEFAULT_ENVIRONMENT
    }
}

/// A value that is either fixed or chosen by environment name.
///
/// Deserializes from either a plain value or an object keyed by environment:
///
/// ```
/// use hub_watcher::config::EnvValue;
///
/// let fixed: EnvValue<String> = serde_json::from_str(r#""http://hub""#).unwrap();
/// assert_eq!(fixed.resolve("production").map(String::as_str), Some("http://hub"));
///
/// let mapped: EnvValue<String> =
///     serde_json::from_str(r#"{"production": "http://hub.prod"}"#).unwrap();
/// assert_eq!(mapped.resolve("staging"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue<T> {
    Fixed(T),
    PerEnvironment(HashMap<String, T>),
}

impl<T> EnvValue<T> {
    /// Resolve the value for the given environment name.
    pub fn resolve(&self, environment: &str) -> Option<&T> {
        match self {
            Self::Fixed(value) => Some(value),
            Self::PerEnvironment(values) => values.get(environment),
        }
    }
}

impl EnvValue<String> {
    /// Parse a raw environment variable: a JSON object is read as a
    /// per-environment map, anything else as a fixed value.
    fn from_raw(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let values: HashMap<String, String> =
                serde_json::from_str(trimmed).context("invalid per-environment host map")?;
            Ok(Self::PerEnvironment(values))
        } else {
            Ok(Self::Fixed(trimmed.to_string()))
        }
    }
}

/// Options passed through to the hub HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubClientOptions {
    /// Per-request timeout for hub calls
    pub timeout: Option<Duration>,

    /// Extra headers sent with every hub request
    pub headers: BTreeMap<String, String>,
}

/// Watcher configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Prefix for remote webhook names (e.g., "orders")
    pub webhook_prefix: String,

    /// Hub base URL, fixed or per environment
    pub hub_host: EnvValue<String>,

    /// Externally visible base URL of this application, fixed or per environment
    pub app_host: EnvValue<String>,

    /// Requested hub-side delivery concurrency
    pub parallel_calls: Option<u32>,

    /// Starting position for newly created webhooks
    pub start_item: Option<String>,

    /// Hub client pass-through options
    pub client: HubClientOptions,
}

impl WatcherConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let hub_host = env::var("HUB_HOST").context("HUB_HOST must be set")?;
        let app_host = env::var("APP_HOST").context("APP_HOST must be set")?;

        Ok(Self {
            webhook_prefix: env::var("HUB_WEBHOOK_PREFIX")
                .context("HUB_WEBHOOK_PREFIX must be set")?,
            hub_host: EnvValue::from_raw(&hub_host)?,
            app_host: EnvValue::from_raw(&app_host)?,
            parallel_calls: env::var("HUB_PARALLEL_CALLS")
                .ok()
                .and_then(|v| v.parse().ok()),
            start_item: env::var("HUB_START_ITEM").ok().filter(|v| !v.is_empty()),
            client: HubClientOptions {
                timeout: env::var("HUB_CLIENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs),
                headers: BTreeMap::new(),
            },
        })
    }

    /// Check that every required value is present for the given environment.
    pub fn validate(&self, environment: &Environment) -> Result<(), WatcherError> {
        if self.webhook_prefix.trim().is_empty() {
            return Err(WatcherError::Config("webhook prefix must be set".into()));
        }
        self.hub_host(environment)?;
        self.app_host(environment)?;
        Ok(())
    }

    /// Hub base URL for the given environment.
    pub fn hub_host(&self, environment: &Environment) -> Result<&str, WatcherError> {
        resolve_host("hub host", &self.hub_host, environment)
    }

    /// Application base URL for the given environment.
    pub fn app_host(&self, environment: &Environment) -> Result<&str, WatcherError> {
        resolve_host("app host", &self.app_host, environment)
    }

    /// Create a configuration for testing against a local hub.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            webhook_prefix: "test".into(),
            hub_host: EnvValue::Fixed("http://hub.test".into()),
            app_host: EnvValue::Fixed("http://app.test:3001".into()),
            parallel_calls: Some(2),
            start_item: None,
            client: HubClientOptions::default(),
        }
    }
}

fn resolve_host<'a>(
    what: &str,
    value: &'a EnvValue<String>,
    environment: &Environment,
) -> Result<&'a str, WatcherError> {
    value
        .resolve(&environment.name)
        .map(|host| host.trim())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| {
            WatcherError::Config(format!(
                "{what} must be set for environment '{}'",
                environment.name
            ))
        })
}
