//! Enrich command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::store::{enrich_store, ChunkStore};
use anyhow::Result;

/// Run the enrich command.
pub async fn run_enrich(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Enrich, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = ChunkStore::new(settings.chunks_path());
    let embedder = OllamaEmbedder::from_settings(settings)?;

    let spinner = Output::spinner(&format!("Embedding chunks with {}...", embedder.model()));
    let result = enrich_store(&store, &embedder).await;
    spinner.finish_and_clear();

    match result {
        Ok(corpus) => {
            Output::success(&format!(
                "Added embeddings and chunk ids to {} chunks in {}",
                corpus.len(),
                store.path().display()
            ));
            Output::info("Run 'klipp cache build' to refresh the embedding cache.");
        }
        Err(e) => {
            Output::error(&format!("Enrichment failed, chunk store left unchanged: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
