//! Mesh connection configuration.
//!
//! A `Config` is validated when built and never mutated afterward, so it can
//! be shared read-only across concurrent invocations.

use reqwest::Url;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Production collaborate endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.hivelink.ai/v1/collaborate";

/// Environment variable consulted by `Config::from_env`.
pub const API_KEY_ENV: &str = "HIVELINK_API_KEY";

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    2
}

fn default_system() -> String {
    "rust-agent".to_string()
}

/// Immutable mesh access parameters
#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    endpoint: Url,
    timeout: Duration,
    max_retries: u32,
    system: String,
    retry: RetryPolicy,
}

impl Config {
    /// Build a config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Read the API key from `HIVELINK_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(api_key)
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Per-attempt request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Additional attempts allowed after the first.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Caller-framework label sent in the request body.
    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Builder that rejects invalid parameters at `build` time
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    system: Option<String>,
    retry: Option<RetryPolicy>,
}

impl ConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<Config> {
        let api_key = self.api_key.unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(Error::Validation(format!(
                "api key must not be empty (set {API_KEY_ENV} or pass one explicitly)"
            )));
        }

        let raw = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&raw)
            .map_err(|e| Error::Validation(format!("endpoint '{raw}' is not an absolute URL: {e}")))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(Error::Validation(format!(
                "endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        let timeout = self.timeout.unwrap_or_else(default_timeout);
        if timeout.is_zero() {
            return Err(Error::Validation("timeout must be positive".to_string()));
        }

        Ok(Config {
            api_key,
            endpoint,
            timeout,
            max_retries: self.max_retries.unwrap_or_else(default_max_retries),
            system: self.system.unwrap_or_else(default_system),
            retry: self.retry.unwrap_or_default(),
        })
    }
}
