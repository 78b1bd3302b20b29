//! Ollama generation implementation.

use super::Generator;
use crate::client::{endpoint_url, http_client};
use crate::config::Settings;
use crate::error::{KlippError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Generator backed by an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for the given server and model.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint_url(base_url, "api/generate")?,
            model: model.to_string(),
        })
    }

    /// Create a generator from the application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.service.base_url,
            &settings.generation.model,
            Duration::from_secs(settings.service.timeout_seconds),
        )
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    /// Returns the `response` field of the reply, or an empty string when the
    /// service leaves it out. Transport and status failures are errors.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| KlippError::Generation(format!("Request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KlippError::Generation(format!(
                "Generation API returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| KlippError::Generation(format!("Malformed generation response: {}", e)))?;

        match parsed.response {
            Some(text) => {
                debug!("Generated {} characters", text.len());
                Ok(text)
            }
            None => {
                warn!("Generation response had no 'response' field, returning empty answer");
                Ok(String::new())
            }
        }
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

    fn generator(base_url: &str) -> OllamaGenerator {
        OllamaGenerator::new(base_url, "deepseek-r1", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_sends_non_streaming_request() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "deepseek-r1");
                assert_eq!(body["stream"], false);
                let prompt = body["prompt"].as_str().unwrap().to_string();
                Json(json!({ "model": "deepseek-r1", "response": format!("echo: {}", prompt), "done": true }))
            }),
        );
        let base = spawn_server(router).await;

        let answer = generator(&base).generate("hello").await.unwrap();
        assert_eq!(answer, "echo: hello");
    }

    #[tokio::test]
    async fn test_missing_response_field_is_empty_answer() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "model": "deepseek-r1", "done": true })) }),
        );
        let base = spawn_server(router).await;

        let answer = generator(&base).generate("hello").await.unwrap();
        assert_eq!(answer, "");
    }

    #[tokio::test]
    async fn test_error_status_is_fatal() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::NOT_FOUND, "model 'deepseek-r1' not found") }),
        );
        let base = spawn_server(router).await;

        let err = generator(&base).generate("hello").await.unwrap_err();
        assert!(matches!(err, KlippError::Generation(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_fatal() {
        let router = Router::new().route("/api/generate", post(|| async { "plain text" }));
        let base = spawn_server(router).await;

        let err = generator(&base).generate("hello").await.unwrap_err();
        assert!(err.is_service_error());
    }
}
