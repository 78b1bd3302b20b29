//! Ollama embeddings implementation.

use super::Embedder;
use crate::client::{endpoint_url, http_client};
use crate::config::Settings;
use crate::error::{KlippError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedder backed by an Ollama-compatible `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl OllamaEmbedder {
    /// Create an embedder for the given server and model.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint_url(base_url, "api/embed")?,
            model: model.to_string(),
        })
    }

    /// Create an embedder from the application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.service.base_url,
            &settings.embedding.model,
            Duration::from_secs(settings.service.timeout_seconds),
        )
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KlippError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| KlippError::Embedding(format!("Request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KlippError::Embedding(format!(
                "Embedding API returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| KlippError::Embedding(format!("Malformed embedding response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(KlippError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        debug!("Generated {} embeddings", parsed.embeddings.len());
        Ok(parsed.embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn embedder(base_url: &str) -> OllamaEmbedder {
        OllamaEmbedder::new(base_url, "bge-m3", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_embed_batch_sends_model_and_inputs() {
        let router = Router::new().route(
            "/api/embed",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "bge-m3");
                let inputs = body["input"].as_array().unwrap();
                let embeddings: Vec<Value> = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, _)| json!([i as f32, 1.0]))
                    .collect();
                Json(json!({ "model": "bge-m3", "embeddings": embeddings }))
            }),
        );
        let base = spawn_server(router).await;

        let texts = vec!["first".to_string(), "second".to_string()];
        let vectors = embedder(&base).embed_batch(&texts).await.unwrap();

        assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_single() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async { Json(json!({ "embeddings": [[0.5, 0.5, 0.0]] })) }),
        );
        let base = spawn_server(router).await;

        let vector = embedder(&base).embed("Who is Lionel Messi?").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let vectors = embedder("http://127.0.0.1:9").embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_response_is_service_error() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async { Json(json!({ "error": "model not found" })) }),
        );
        let base = spawn_server(router).await;

        let err = embedder(&base).embed("text").await.unwrap_err();
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_service_error() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async { Json(json!({ "embeddings": [[1.0]] })) }),
        );
        let base = spawn_server(router).await;

        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embedder(&base).embed_batch(&texts).await.unwrap_err();
        assert!(matches!(err, KlippError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "out of memory") }),
        );
        let base = spawn_server(router).await;

        let err = embedder(&base).embed("text").await.unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let err = embedder("http://127.0.0.1:9").embed("text").await.unwrap_err();
        assert!(err.is_service_error());
    }
}
