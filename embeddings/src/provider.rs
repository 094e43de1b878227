//! Embedding providers.
//!
//! The provider trait is the seam between retrieval and whatever produces
//! dense vectors. The shipped implementation speaks the OpenAI-style
//! `/embeddings` HTTP API and consults the [`EgressPolicy`] before every
//! request.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::Embedding;
use crate::egress::EgressPolicy;
use crate::error::{EmbeddingError, Result};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, used for cache keying and logging.
    fn model(&self) -> &str;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// HTTP embedding provider for OpenAI-compatible APIs.
pub struct HttpEmbeddingProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// Model sent with every request.
    model: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Origins this provider may reach.
    egress: EgressPolicy,
}

impl HttpEmbeddingProvider {
    /// Create a provider against a base URL, allowing egress to it.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let egress = EgressPolicy::allow_origins([base_url.as_str()])?;
        Ok(Self {
            api_key: None,
            base_url,
            model: "text-embedding-3-small".to_string(),
            client: reqwest::Client::new(),
            egress,
        })
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the egress policy.
    pub fn with_egress_policy(mut self, egress: EgressPolicy) -> Self {
        self.egress = egress;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let url = format!("{}/embeddings", self.base_url);
        self.egress.check(&url)?;

        debug!(model = %self.model, "requesting embedding");

        let body = serde_json::json!({
            "input": text,
            "model": self.model
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error: {error_text}"
            )));
        }

        let result: ApiEmbeddingResponse = response.json().await?;

        result
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding in response".to_string()))
    }
}

/// OpenAI-style API response format.
#[derive(Debug, Deserialize)]
struct ApiEmbeddingResponse {
    data: Vec<ApiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embed_returns_first_vector_from_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [0.1, 0.2, 0.3] }]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri())
            .unwrap()
            .with_api_key("test-key");

        let embedding = provider.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let provider = HttpEmbeddingProvider::new("https://api.example.com").unwrap();
        let err = provider.embed("hello").await;
        assert!(matches!(err, Err(EmbeddingError::ProviderNotConfigured)));
    }

    #[tokio::test]
    async fn deny_all_policy_blocks_the_request() {
        let server = MockServer::start().await;
        let provider = HttpEmbeddingProvider::new(server.uri())
            .unwrap()
            .with_api_key("test-key")
            .with_egress_policy(EgressPolicy::deny_all());

        let err = provider.embed("hello").await;
        assert!(matches!(err, Err(EmbeddingError::EgressBlocked { .. })));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_failure_surfaces_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri())
            .unwrap()
            .with_api_key("test-key");

        match provider.embed("hello").await {
            Err(EmbeddingError::ApiRequest(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected ApiRequest error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_reports_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri())
            .unwrap()
            .with_api_key("test-key");

        match provider.embed("hello").await {
            Err(EmbeddingError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 7);
            }
            other => panic!("expected RateLimited error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_data_is_an_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri())
            .unwrap()
            .with_api_key("test-key");

        let err = provider.embed("hello").await;
        assert!(matches!(err, Err(EmbeddingError::InvalidResponse(_))));
    }
}
