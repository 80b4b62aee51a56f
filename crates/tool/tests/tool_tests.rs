//! End-to-end tests for the tool adapter against a mock mesh.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hivelink_tool::{Config, Error, HivelinkTool, InvokeOptions, RetryPolicy, Tool};

fn test_tool(server: &MockServer) -> HivelinkTool {
    let config = Config::builder()
        .api_key("hl-test-key")
        .endpoint(format!("{}/v1/collaborate", server.uri()))
        .retry(
            RetryPolicy::new()
                .with_initial_delay(Duration::from_millis(10))
                .with_jitter_factor(0.0),
        )
        .build()
        .unwrap();
    HivelinkTool::new(config)
}

#[tokio::test]
async fn test_invoke_returns_recommendation_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/collaborate"))
        .and(header("Authorization", "Bearer hl-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insight": { "recommendation": "Batch the writes and fsync once per batch." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = test_tool(&server);
    let answer = tool.invoke("How do I speed up ingestion?").await.unwrap();

    assert_eq!(answer, "Batch the writes and fsync once per batch.");
}

#[tokio::test]
async fn test_invoke_rejects_blank_query_without_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tool = test_tool(&server);
    let result = tool.invoke("  \n ").await;

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_passthrough_fields_forwarded_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/collaborate"))
        .and(body_partial_json(json!({
            "system": "rust-agent",
            "query": "Pick a model",
            "model": "mesh-large",
            "temperature": 0.2,
            "context": { "tier": "free" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insight": { "recommendation": "mesh-large it is" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = test_tool(&server);
    let options = InvokeOptions::new()
        .with_context(json!({"tier": "free"}))
        .with_field("model", json!("mesh-large"))
        .with_field("temperature", json!(0.2));
    let answer = tool.invoke_async("Pick a model", options).await.unwrap();

    assert_eq!(answer, "mesh-large it is");
}

#[tokio::test]
async fn test_invoke_detailed_exposes_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/collaborate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insight": { "recommendation": "Use consistent hashing.", "confidence": 0.87 },
            "agents_consulted": 312,
            "predictive_intelligence": {
                "you_will_probably_ask_next": [
                    "How many virtual nodes per shard?",
                    "How do I handle hot keys?"
                ]
            },
            "usage": { "prompt_tokens": 8, "completion_tokens": 21, "total_tokens": 29 }
        })))
        .mount(&server)
        .await;

    let tool = test_tool(&server);
    let result = tool
        .invoke_detailed("How should I shard?", InvokeOptions::new())
        .await
        .unwrap();

    assert_eq!(result.recommendation, "Use consistent hashing.");
    assert_eq!(result.confidence, Some(0.87));
    assert_eq!(result.agents_consulted, Some(312));
    assert_eq!(result.follow_ups.len(), 2);
    assert_eq!(result.usage.total_tokens, 29);
}

#[tokio::test]
async fn test_auth_error_propagates_through_tool() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/collaborate"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let tool = test_tool(&server);
    let result = tool.invoke("hello mesh").await;

    assert!(matches!(result, Err(Error::Auth(_))));
}

#[test]
fn test_construction_fails_on_bad_config_not_first_use() {
    let result = Config::builder()
        .api_key("")
        .endpoint("http://localhost:1/v1/collaborate")
        .build();
    assert!(matches!(result, Err(Error::Validation(_))));
}
