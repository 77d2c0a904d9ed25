//! Tests for the built-in adapters' health probes against a mock HTTP server.

use std::sync::Arc;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nutrigate::providers::AnalysisProvider;
use nutrigate::{LlmAnalysisProvider, Orchestrator, ProviderKind};

fn adapter(kind: ProviderKind, server: &MockServer) -> LlmAnalysisProvider {
    LlmAnalysisProvider::new(kind, Some("test-key"))
        .health_url(format!("{}/v1/models", server.uri()))
}

#[tokio::test]
async fn openai_probe_uses_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(adapter(ProviderKind::OpenAi, &server).health_check().await);
}

#[tokio::test]
async fn anthropic_probe_sends_version_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(adapter(ProviderKind::Anthropic, &server).health_check().await);
}

#[tokio::test]
async fn gemini_probe_uses_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(adapter(ProviderKind::Gemini, &server).health_check().await);
}

#[tokio::test]
async fn error_status_is_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!adapter(ProviderKind::OpenAi, &server).health_check().await);
}

#[tokio::test]
async fn unreachable_endpoint_is_unhealthy() {
    let server = MockServer::start().await;
    let url = format!("{}/v1/models", server.uri());
    drop(server);

    let provider =
        LlmAnalysisProvider::new(ProviderKind::Gemini, Some("test-key")).health_url(url);
    assert!(!provider.health_check().await);
}

#[tokio::test]
async fn probe_results_feed_provider_health() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&healthy)
        .await;
    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&failing)
        .await;

    let orchestrator = Orchestrator::builder()
        .provider(Arc::new(adapter(ProviderKind::OpenAi, &healthy)))
        .provider(Arc::new(adapter(ProviderKind::Gemini, &failing)))
        .build()
        .unwrap();

    let probes = orchestrator.probe_providers().await;
    assert_eq!(probes[&ProviderKind::OpenAi], true);
    assert_eq!(probes[&ProviderKind::Gemini], false);

    let health = orchestrator.provider_health();
    assert_eq!(health[&ProviderKind::OpenAi].recent_success_rate, 1.0);
    assert_eq!(health[&ProviderKind::Gemini].recent_success_rate, 0.0);
}
