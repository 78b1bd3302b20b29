//! Shared helpers for unit tests.

use crate::embedding::Embedder;
use crate::error::{KlippError, Result};
use crate::generation::Generator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Embedder with a fixed text -> vector table.
#[derive(Default)]
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.to_vec());
        texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .or(self.fallback.as_ref())
                    .cloned()
                    .ok_or_else(|| KlippError::Embedding(format!("no vector for '{}'", t)))
            })
            .collect()
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Embedder that always fails, like an unreachable service.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(KlippError::Embedding("connection refused".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(KlippError::Embedding("connection refused".to_string()))
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Generator that records prompts and answers with a canned response.
pub struct CannedGenerator {
    response: String,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }

    fn model(&self) -> &str {
        "canned"
    }
}
