//! Pre-flight checks before expensive operations.
//!
//! Validates that required files and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::client::is_api_key_configured;
use crate::config::Settings;
use crate::error::{KlippError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcription requires the OpenAI API key.
    Transcribe,
    /// Enrichment and cache building require a chunk store.
    Enrich,
    /// Asking and searching require a cache or a chunk store.
    Query,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Transcribe => check_api_key(),
        Operation::Enrich => check_chunk_store(settings),
        Operation::Query => {
            if settings.cache_path().exists() {
                Ok(())
            } else {
                check_chunk_store(settings)
            }
        }
    }
}

fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(KlippError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

fn check_chunk_store(settings: &Settings) -> Result<()> {
    let path = settings.chunks_path();
    if path.exists() {
        Ok(())
    } else {
        Err(KlippError::Storage(format!(
            "No chunk store at {}. Run 'klipp transcribe <audio>' first.",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.to_string_lossy().to_string();
        settings
    }

    #[test]
    fn test_query_needs_store_or_cache() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        assert!(check(Operation::Query, &settings).is_err());

        std::fs::write(settings.cache_path(), b"KLPC").unwrap();
        assert!(check(Operation::Query, &settings).is_ok());
    }

    #[test]
    fn test_enrich_needs_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        assert!(matches!(check(Operation::Enrich, &settings), Err(KlippError::Storage(_))));

        std::fs::write(settings.chunks_path(), "[]").unwrap();
        assert!(check(Operation::Enrich, &settings).is_ok());
    }
}
