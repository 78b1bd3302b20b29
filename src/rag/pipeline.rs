//! The per-query pipeline: load, embed, search, prompt, generate.

use super::PromptBuilder;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::error::Result;
use crate::generation::{Generator, OllamaGenerator};
use crate::search::{search, RankedResult};
use crate::store::{into_enriched, ChunkStore, EmbeddingCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An answer together with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Text returned by the generator; empty if it returned none.
    pub response: String,
    /// Chunks handed to the prompt, best first.
    pub sources: RankedResult,
}

/// Answers questions from the enriched corpus.
pub struct QueryPipeline {
    cache: EmbeddingCache,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    builder: PromptBuilder,
    prompt_path: PathBuf,
}

impl QueryPipeline {
    /// Create a pipeline from its parts.
    pub fn new(
        cache: EmbeddingCache,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        builder: PromptBuilder,
        prompt_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cache,
            embedder,
            generator,
            builder,
            prompt_path: prompt_path.into(),
        }
    }

    /// Create a pipeline wired to the configured services and files.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let store = ChunkStore::new(settings.chunks_path());
        let cache = EmbeddingCache::new(settings.cache_path(), store);

        Ok(Self::new(
            cache,
            Arc::new(OllamaEmbedder::from_settings(settings)?),
            Arc::new(OllamaGenerator::from_settings(settings)?),
            PromptBuilder::new(prompts),
            settings.prompt_path(),
        ))
    }

    /// Where the last rendered prompt is written.
    pub fn prompt_path(&self) -> &Path {
        &self.prompt_path
    }

    /// Find the `top_k` chunks most similar to `query`.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RankedResult> {
        let corpus = into_enriched(self.cache.load()?)?;

        info!("Searching {} chunks for relevant content", corpus.len());
        let query_embedding = self.embedder.embed(query).await?;

        search(&query_embedding, &corpus, top_k)
    }

    /// Answer `query` and return the sources alongside the response.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<Answer> {
        let sources = self.retrieve(query, top_k).await?;

        let prompt = self.builder.build(query, &sources)?;
        self.write_prompt(&prompt).await?;

        info!("Generating response with {}", self.generator.model());
        let response = self.generator.generate(&prompt).await?;

        Ok(Answer { response, sources })
    }

    /// Answer `query` with the `top_k` most relevant chunks as context.
    pub async fn process(&self, query: &str, top_k: usize) -> Result<String> {
        Ok(self.answer(query, top_k).await?.response)
    }

    async fn write_prompt(&self, prompt: &str) -> Result<()> {
        if let Some(parent) = self.prompt_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.prompt_path, prompt).await?;
        debug!("Prompt written to {}", self.prompt_path.display());
        Ok(())
    }
}
