//! Hivelink client: HTTP transport to the collaboration mesh.
//!
//! The mesh is an opaque remote service reached at a single endpoint. This
//! crate owns the outbound side of a call: configuration, authentication,
//! the retry/backoff loop, and the error taxonomy surfaced to callers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod http;
pub mod retry;

pub use config::{Config, ConfigBuilder};
pub use http::{Client, InvokeOptions};
pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;

/// Mesh invocation errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("authentication rejected: {0} (check the API key)")]
    Auth(String),

    #[error("rate limited by the mesh, retry budget exhausted")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("unexpected response shape: {0}")]
    Protocol(String),

    #[error("invocation cancelled by caller")]
    Cancelled,
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Transport failure with no underlying I/O cause.
    pub fn transport_message(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parsed mesh response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    /// Recommendation text, returned to the caller verbatim.
    pub recommendation: String,
    /// Mesh confidence in the recommendation, 0.0 to 1.0.
    pub confidence: Option<f64>,
    /// How many agents contributed.
    pub agents_consulted: Option<u32>,
    /// Follow-up questions the mesh predicts the caller will ask.
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

/// Resource consumption
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
