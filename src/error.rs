//! Error types for Klipp.

use thiserror::Error;

/// Library-level error type for Klipp operations.
#[derive(Error, Debug)]
pub enum KlippError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk store error: {0}")]
    Storage(String),

    #[error("Corpus is not enriched: {0}. Run 'klipp enrich' first.")]
    NotEnriched(String),

    #[error("Embedding cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KlippError {
    /// Whether this error came from one of the external services
    /// (embedding, generation or transcription).
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            KlippError::Embedding(_)
                | KlippError::Generation(_)
                | KlippError::Transcription(_)
                | KlippError::OpenAI(_)
                | KlippError::Http(_)
        )
    }
}

/// Result type alias for Klipp operations.
pub type Result<T> = std::result::Result<T, KlippError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_grouping() {
        assert!(KlippError::Embedding("down".to_string()).is_service_error());
        assert!(KlippError::Generation("down".to_string()).is_service_error());
        assert!(!KlippError::DimensionMismatch { expected: 2, actual: 3 }.is_service_error());
        assert!(!KlippError::Storage("missing".to_string()).is_service_error());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = KlippError::DimensionMismatch { expected: 1024, actual: 768 };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 1024, got 768"
        );
    }
}
