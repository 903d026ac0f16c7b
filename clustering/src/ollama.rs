use std::time::Duration;

use async_trait::async_trait;
use bt_core::EmbeddingProvider;
use config::EmbeddingConfig;
use errors::EmbeddingError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

const TAGS_PATH: &str = "/api/tags";
const EMBEDDINGS_PATH: &str = "/api/embeddings";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>
}

/// HTTP client for an Ollama-compatible embedding server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
    probe_timeout: Duration,
    available: RwLock<Option<bool>>
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            available: RwLock::new(None)
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(&config.base_url, &config.model).with_timeouts(
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.probe_timeout_secs)
        )
    }

    pub fn with_timeouts(mut self, request: Duration, probe: Duration) -> Self {
        self.request_timeout = request;
        self.probe_timeout = probe;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn probe(&self) -> bool {
        let url = format!("{}{}", self.base_url, TAGS_PATH);
        let result = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "Embedding service probe rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "Embedding service probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    type Error = EmbeddingError;

    async fn is_available(&self) -> bool {
        if let Some(available) = *self.available.read().await {
            return available;
        }
        self.refresh().await
    }

    async fn refresh(&self) -> bool {
        let available = self.probe().await;
        *self.available.write().await = Some(available);
        if !available {
            warn!(url = %self.base_url, "Embedding service not available");
        }
        available
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let url = format!("{}{}", self.base_url, EMBEDDINGS_PATH);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout {
                        timeout_ms: self.request_timeout.as_millis() as u64
                    }
                } else {
                    EmbeddingError::Request {
                        url: url.clone(),
                        reason: e.to_string()
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body
            });
        }

        let parsed: EmbeddingResponse =
            response.json().await.map_err(|e| EmbeddingError::Decode {
                reason: e.to_string()
            })?;

        if parsed.embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        Ok(parsed.embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_result_is_cached_until_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
            .expect(2)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), DEFAULT_MODEL);
        assert!(client.is_available().await);
        assert!(client.is_available().await);
        assert!(client.refresh().await);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let server = MockServer::start().await;
        let client = OllamaClient::new(&server.uri(), DEFAULT_MODEL);
        assert!(!client.is_available().await);
    }

    #[tokio::test]
    async fn test_embed_posts_model_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(json!({ "model": "nomic-embed-text", "prompt": "hello" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.5, -0.25, 1.0] }))
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&format!("{}/", server.uri()), DEFAULT_MODEL);
        let vector = client.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.5, -0.25, 1.0]);
        assert_eq!(client.model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_embed_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), "missing-model");
        match client.embed("x").await {
            Err(EmbeddingError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "model not found");
            }
            other => panic!("expected status error, got {other:?}")
        }
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [] })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), DEFAULT_MODEL);
        assert!(matches!(
            client.embed("x").await,
            Err(EmbeddingError::EmptyEmbedding)
        ));
    }

    #[tokio::test]
    async fn test_embed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "embedding": [1.0] }))
                    .set_delay(Duration::from_millis(500))
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), DEFAULT_MODEL)
            .with_timeouts(Duration::from_millis(50), Duration::from_millis(50));
        assert!(matches!(
            client.embed("x").await,
            Err(EmbeddingError::Timeout { timeout_ms: 50 })
        ));
    }
}
