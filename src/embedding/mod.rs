//! Embedding generation for semantic search and retrieval.

mod ollama;

pub use ollama::OllamaEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one per input and in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Name of the model behind this embedder.
    fn model(&self) -> &str;
}
