#![allow(dead_code)]

use analysis_service::config::{AnalysisConfig, CompletionConfig, CorsConfig};
use analysis_service::services::providers::mock::MockCompletionProvider;
use analysis_service::startup::{build_router, AppState, Application};
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "test-api-key";
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub const SAMPLE_PERCENTAGES: [u32; 10] = [80, 60, 50, 40, 70, 30, 65, 55, 75, 45];

pub fn test_config(api_url: &str, api_key: Option<&str>) -> AnalysisConfig {
    AnalysisConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            log_level: "error".to_string(),
        },
        environment: "test".to_string(),
        completion: CompletionConfig {
            api_key: api_key.map(|k| Secret::new(k.to_string())),
            api_url: api_url.to_string(),
            model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            timeout: Duration::from_secs(5),
        },
        cors: CorsConfig::default(),
        otlp_endpoint: None,
    }
}

/// Router backed by the mock provider, for `oneshot` tests.
pub fn mock_router(enabled: bool) -> (Router, Arc<MockCompletionProvider>) {
    let provider = Arc::new(MockCompletionProvider::new(enabled));
    let state = AppState::new(
        test_config("http://127.0.0.1:9/unused", None),
        provider.clone(),
    );
    let router = build_router(state).expect("Failed to build router");
    (router, provider)
}

pub fn analyze_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the real application, wired to the chat completions provider.
    pub async fn spawn(config: AnalysisConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();

        // Wait for the server to be ready by polling the health endpoint
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp { address, client }
    }

    pub async fn analyze(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/analyze", self.address))
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .expect("Failed to send request")
    }
}
