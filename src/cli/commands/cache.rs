//! Cache command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use crate::store::{into_enriched, ChunkStore, EmbeddingCache};
use anyhow::Result;

/// Run the cache command.
pub fn run_cache(action: &CacheAction, settings: &Settings) -> Result<()> {
    let cache = EmbeddingCache::new(settings.cache_path(), ChunkStore::new(settings.chunks_path()));

    match action {
        CacheAction::Build => {
            if let Err(e) = preflight::check(Operation::Enrich, settings) {
                Output::error(&format!("{}", e));
                return Err(e.into());
            }

            let chunks = into_enriched(cache.store().load()?)?;
            cache.write(&chunks)?;
            Output::success(&format!(
                "Cached {} embeddings at {}",
                chunks.len(),
                cache.path().display()
            ));
        }

        CacheAction::Clear => {
            if cache.clear()? {
                Output::success(&format!("Removed {}", cache.path().display()));
            } else {
                Output::info("No embedding cache to remove.");
            }
        }
    }

    Ok(())
}
