//! Text generation for answering questions from retrieved context.

mod ollama;

pub use ollama::OllamaGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the model behind this generator.
    fn model(&self) -> &str;
}
