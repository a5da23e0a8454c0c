//! End-to-end tests through the real HTTP adapters
//!
//! Builds the orchestration manager with `HttpProviderFactory` pointed at two
//! wiremock servers standing in for the hosted APIs.

use finrec::config::Config;
use finrec::domain::{FinancialProduct, ProductType, RiskLevel};
use finrec::intent::IntentType;
use finrec::metrics::Metrics;
use finrec::orchestrator::OrchestrationManager;
use finrec::providers::HttpProviderFactory;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPLY: &str = "INTENT_TYPE: product_recommendation\n\
CONFIDENCE: 0.9\n\
RISK_TOLERANCE: low\n\
The Core Bond Fund fits because it keeps volatility low.";

async fn mount_models(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({"data": [{"id": "served-model"}]})),
        )
        .mount(server)
        .await;
}

fn config(anthropic: &MockServer, openai: &MockServer) -> Config {
    Config::from_str(&format!(
        r#"
[llm]
primary = "anthropic"
backoff_unit_ms = 10
timeout_seconds = 5

[providers.anthropic]
api_key = "sk-ant-e2e"
base_url = "{}"

[providers.openai]
api_key = "sk-openai-e2e"
base_url = "{}"
"#,
        anthropic.uri(),
        openai.uri()
    ))
    .expect("config should parse")
}

fn catalog() -> Vec<FinancialProduct> {
    vec![
        FinancialProduct::new("B1", "Core Bond Fund", ProductType::Bond, RiskLevel::Low),
        FinancialProduct::new("E1", "Broad Market ETF", ProductType::Etf, RiskLevel::Medium),
    ]
}

fn manager(config: Config) -> OrchestrationManager {
    OrchestrationManager::new(
        config,
        Arc::new(HttpProviderFactory),
        Metrics::new().expect("Failed to create metrics"),
    )
}

#[tokio::test]
async fn test_anthropic_failure_fails_over_to_openai() {
    let anthropic = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_models(&anthropic, 200).await;
    mount_models(&openai, 200).await;

    // Non-retryable error: one attempt per stage
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad request"}
        })))
        .expect(2)
        .mount(&anthropic)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": REPLY}}],
            "usage": {"total_tokens": 321}
        })))
        .expect(2)
        .mount(&openai)
        .await;

    let manager = manager(config(&anthropic, &openai));
    assert!(manager.initialize().await.unwrap());

    let result = manager
        .process_query("Something safe please", &catalog(), None, &[])
        .await
        .unwrap();

    assert_eq!(result.provider(), Some("openai"));
    assert_eq!(result.metadata()["intent_provider"], "openai");
    assert_eq!(result.metadata()["tokens_used"], 321);
    assert_eq!(result.intent_type(), IntentType::ProductRecommendation);
    assert_eq!(result.recommendations()[0].product_id, "B1");
}

#[tokio::test]
async fn test_every_backend_down_serves_canned_answer() {
    let anthropic = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_models(&anthropic, 200).await;
    mount_models(&openai, 200).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded_error"))
        .mount(&anthropic)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .mount(&openai)
        .await;

    let manager = manager(config(&anthropic, &openai));
    manager.initialize().await.unwrap();

    let result = manager
        .process_query("Something safe please", &catalog(), None, &[])
        .await
        .unwrap();

    assert!(result.is_error());
    assert_eq!(result.confidence(), 0.0);

    // Primary retried both stages three times; secondary tried once per stage
    let anthropic_posts = anthropic
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    let openai_posts = openai
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(anthropic_posts, 6);
    assert_eq!(openai_posts, 2);
}

#[tokio::test]
async fn test_health_and_models_through_http() {
    let anthropic = MockServer::start().await;
    let openai = MockServer::start().await;
    mount_models(&anthropic, 200).await;
    mount_models(&openai, 503).await;

    let manager = manager(config(&anthropic, &openai));
    assert!(manager.initialize().await.unwrap());

    let status = manager.health_check().await;
    assert!(status.primary_healthy);
    assert!(!status.secondary_healthy);
    assert_eq!(status.active_provider, "anthropic");
    assert!(status.fallback_available);

    let models = manager.list_available_models().await;
    assert_eq!(models["anthropic"], vec!["served-model"]);
    assert!(models["openai"].is_empty());
}
