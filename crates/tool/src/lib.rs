//! Hivelink tool: expose the collaboration mesh to agent frameworks.
//!
//! Agent loops discover callable tools through a narrow contract: a name, a
//! description the model reads to decide when to call it, a JSON parameter
//! schema, and an invoke that takes text and returns text. `HivelinkTool`
//! implements that contract on top of `hivelink-client`; framework-specific
//! bindings stay thin conformance shims over the `Tool` trait.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

pub use hivelink_client::{
    CancellationToken, Collaboration, Config, ConfigBuilder, Error, InvokeOptions, Result,
    RetryPolicy, Usage,
};

use hivelink_client::Client;

/// Capability contract consumed by agent frameworks.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn invoke(&self, query: &str) -> Result<String>;
}

const TOOL_NAME: &str = "hivelink_collaborate";

const TOOL_DESCRIPTION: &str = "Consult the Hivelink mesh of autonomous agents. \
Use this for problems that benefit from collective reasoning across many agents. \
Input is a question or problem statement; output is the mesh's recommendation.";

/// Mesh collaboration tool
pub struct HivelinkTool {
    client: Client,
}

impl HivelinkTool {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Build from the `HIVELINK_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Config::from_env()?))
    }

    /// Non-blocking invocation, returning the recommendation text verbatim.
    pub async fn invoke_async(&self, query: &str, options: InvokeOptions) -> Result<String> {
        debug!(tool = TOOL_NAME, "invoking mesh collaboration");
        let result = self.client.collaborate(query, &options).await?;
        Ok(result.recommendation)
    }

    /// Same lifecycle as `invoke_async`, but returns the structured response
    /// (confidence, agents consulted, follow-ups, usage) for callers that
    /// want the metadata.
    pub async fn invoke_detailed(
        &self,
        query: &str,
        options: InvokeOptions,
    ) -> Result<Collaboration> {
        debug!(tool = TOOL_NAME, "invoking mesh collaboration (detailed)");
        self.client.collaborate(query, &options).await
    }

    /// Blocking invocation for frameworks that call tools inline.
    ///
    /// Spins up a current-thread runtime per call and blocks the calling
    /// thread for the whole exchange, retries included. Must not be called
    /// from inside an async context; use `invoke_async` there.
    pub fn invoke_blocking(&self, query: &str, options: InvokeOptions) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::transport_message(format!("failed to start blocking runtime: {e}"))
            })?;
        runtime.block_on(self.invoke_async(query, options))
    }
}

#[async_trait]
impl Tool for HivelinkTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        TOOL_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question or problem to put to the mesh"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        self.invoke_async(query, InvokeOptions::new()).await
    }
}
