//! HTTP exchange with the collaborate endpoint.
//!
//! One invocation walks a small state machine: send an attempt, classify the
//! outcome as success, fatal, or retryable, and re-enter sending after a
//! backoff until the retry budget or deadline runs out. All state is local
//! to the call, so a `Client` is safe to share across tasks.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::{Collaboration, Error, Result, Usage};

/// Per-invocation overrides
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Context object forwarded to the mesh unchanged.
    pub context: Option<Value>,
    /// Extra top-level body fields (e.g. model, temperature), forwarded
    /// unchanged.
    pub passthrough: serde_json::Map<String, Value>,
    /// Total budget across all attempts; retrying stops once it is reached.
    pub deadline: Option<Duration>,
    /// Cooperative cancellation; aborts the in-flight exchange promptly.
    pub cancel: Option<CancellationToken>,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.passthrough.insert(key.into(), value);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Outcome of a single attempt.
enum Attempt {
    Success(Collaboration),
    Fatal(Error),
    Retryable {
        error: Error,
        retry_after: Option<Duration>,
    },
}

/// Mesh HTTP client
pub struct Client {
    http: reqwest::Client,
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Submit a query and wait for the mesh's answer.
    ///
    /// Network-level failures (connect errors, per-attempt timeouts, 5xx)
    /// and 429 are retried with backoff up to `max_retries` extra attempts;
    /// everything else surfaces immediately.
    pub async fn collaborate(&self, query: &str, options: &InvokeOptions) -> Result<Collaboration> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }

        let body = self.build_request(query, options);
        let deadline = options.deadline.map(|d| Instant::now() + d);
        let cancel = options.cancel.as_ref();
        let mut attempt: u32 = 0;

        loop {
            let timeout = match deadline {
                Some(at) => self
                    .config
                    .timeout()
                    .min(at.saturating_duration_since(Instant::now()))
                    .max(Duration::from_millis(1)),
                None => self.config.timeout(),
            };

            trace!(attempt, endpoint = %self.config.endpoint(), "sending collaborate request");
            match self.send_once(&body, timeout, cancel).await {
                Attempt::Success(result) => {
                    debug!(
                        attempts = attempt + 1,
                        agents = ?result.agents_consulted,
                        "collaboration succeeded"
                    );
                    return Ok(result);
                }
                Attempt::Fatal(error) => return Err(error),
                Attempt::Retryable { error, retry_after } => {
                    if attempt >= self.config.max_retries() {
                        warn!(attempts = attempt + 1, %error, "retry budget exhausted");
                        return Err(error);
                    }

                    let delay = retry_after
                        .unwrap_or_else(|| self.config.retry().delay_for(attempt));
                    if let Some(at) = deadline {
                        let remaining = at.saturating_duration_since(Instant::now());
                        if delay >= remaining {
                            warn!(attempts = attempt + 1, %error, "deadline reached, not retrying");
                            return Err(error);
                        }
                    }

                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "attempt failed, backing off"
                    );
                    match cancel {
                        Some(token) => tokio::select! {
                            _ = token.cancelled() => return Err(Error::Cancelled),
                            _ = sleep(delay) => {}
                        },
                        None => sleep(delay).await,
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn build_request(&self, query: &str, options: &InvokeOptions) -> Value {
        let mut body = json!({
            "system": self.config.system(),
            "query": query,
            "context": options.context.clone().unwrap_or_else(|| json!({})),
        });
        if let Value::Object(map) = &mut body {
            for (key, value) in &options.passthrough {
                map.insert(key.clone(), value.clone());
            }
        }
        body
    }

    async fn send_once(
        &self,
        body: &Value,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Attempt {
        let request = self
            .http
            .post(self.config.endpoint().clone())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .json(body)
            .timeout(timeout);

        let sent = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Attempt::Fatal(Error::Cancelled),
                result = request.send() => result,
            },
            None => request.send().await,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    "attempt timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                return Attempt::Retryable {
                    error: Error::transport(message, e),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    return Attempt::Retryable {
                        error: Error::transport("failed to read response body", e),
                        retry_after: None,
                    }
                }
            };
            return match parse_response(&text) {
                Ok(result) => Attempt::Success(result),
                Err(error) => Attempt::Fatal(error),
            };
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Attempt::Fatal(Error::Auth(error_detail(response).await))
            }
            StatusCode::BAD_REQUEST => {
                Attempt::Fatal(Error::Validation(error_detail(response).await))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = retry_after_seconds(&response);
                Attempt::Retryable {
                    error: Error::RateLimited { retry_after },
                    retry_after,
                }
            }
            s if s.is_server_error() => Attempt::Retryable {
                error: Error::transport_message(error_detail(response).await),
                retry_after: None,
            },
            _ => Attempt::Fatal(Error::transport_message(error_detail(response).await)),
        }
    }
}

/// Delta-seconds form only; an HTTP-date falls back to standard backoff.
fn retry_after_seconds(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body: Option<Value> = response.json().await.ok();
    let detail = body.as_ref().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .map(str::to_string)
    });
    match detail {
        Some(detail) => format!("{status}: {detail}"),
        None => status.to_string(),
    }
}

#[derive(Deserialize)]
struct WireResponse {
    insight: Option<WireInsight>,
    agents_consulted: Option<u32>,
    predictive_intelligence: Option<WirePredictive>,
    status: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct WireInsight {
    recommendation: Option<String>,
    confidence: Option<f64>,
}

#[derive(Deserialize)]
struct WirePredictive {
    #[serde(default)]
    you_will_probably_ask_next: Vec<String>,
}

fn parse_response(body: &str) -> Result<Collaboration> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("response body is not valid JSON: {e}")))?;

    let insight = wire
        .insight
        .ok_or_else(|| Error::Protocol("response carries no insight object".to_string()))?;
    let recommendation = insight
        .recommendation
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| Error::Protocol("insight carries no recommendation text".to_string()))?;

    Ok(Collaboration {
        recommendation,
        confidence: insight.confidence,
        agents_consulted: wire.agents_consulted,
        follow_ups: wire
            .predictive_intelligence
            .map(|p| p.you_will_probably_ask_next)
            .unwrap_or_default(),
        status: wire.status,
        usage: wire.usage.unwrap_or_default(),
    })
}
