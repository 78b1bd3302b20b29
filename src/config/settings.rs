//! Configuration settings for Klipp.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub service: ServiceSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub transcription: TranscriptionSettings,
    pub store: StoreSettings,
    pub query: QuerySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing the chunk store, cache and prompt file.
    pub data_dir: String,
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.klipp".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Connection settings for the embedding and generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Base URL of the Ollama-compatible server.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_seconds: crate::client::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "bge-m3".to_string(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// LLM model for response generation.
    pub model: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "deepseek-r1".to_string(),
        }
    }
}

/// What the speech-to-text model should produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionTask {
    /// Source-language audio to English text.
    #[default]
    Translate,
    /// Source-language audio to source-language text.
    Transcribe,
}

impl std::str::FromStr for TranscriptionTask {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "translate" => Ok(TranscriptionTask::Translate),
            "transcribe" => Ok(TranscriptionTask::Transcribe),
            _ => Err(format!("Unknown transcription task: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionTask::Translate => write!(f, "translate"),
            TranscriptionTask::Transcribe => write!(f, "transcribe"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Source language of the audio (ISO-639-1).
    pub language: String,
    /// Translate to English or transcribe as-is.
    pub task: TranscriptionTask,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: "hi".to_string(),
            task: TranscriptionTask::Translate,
        }
    }
}

/// File locations. Relative paths are resolved against `general.data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Chunk store (JSON array of chunks).
    pub chunks_file: String,
    /// Binary embedding cache.
    pub cache_file: String,
    /// Last rendered prompt, for inspection.
    pub prompt_file: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            chunks_file: "data.json".to_string(),
            cache_file: "embeddings.bin".to_string(),
            prompt_file: "prompt.txt".to_string(),
        }
    }
}

/// Query pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Number of chunks handed to the prompt.
    pub top_k: usize,
    /// Query used when klipp runs without a command.
    pub example_query: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            top_k: 50,
            example_query: "Tell me about Marco van Basten".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::KlippError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("klipp")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    fn data_path(&self, file: &str) -> PathBuf {
        let path = Self::expand_path(file);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }

    /// Path of the chunk store file.
    pub fn chunks_path(&self) -> PathBuf {
        self.data_path(&self.store.chunks_file)
    }

    /// Path of the embedding cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.data_path(&self.store.cache_file)
    }

    /// Path of the prompt diagnostic file.
    pub fn prompt_path(&self) -> PathBuf {
        self.data_path(&self.store.prompt_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.service.base_url, "http://localhost:11434");
        assert_eq!(settings.embedding.model, "bge-m3");
        assert_eq!(settings.generation.model, "deepseek-r1");
        assert_eq!(settings.query.top_k, 50);
        assert_eq!(settings.transcription.task, TranscriptionTask::Translate);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [general]
            data_dir = "/srv/klipp"

            [query]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.query.top_k, 5);
        assert_eq!(settings.chunks_path(), PathBuf::from("/srv/klipp/data.json"));
        assert_eq!(settings.embedding.model, "bge-m3");
    }

    #[test]
    fn test_absolute_store_paths_are_kept() {
        let mut settings = Settings::default();
        settings.store.cache_file = "/var/cache/klipp.bin".to_string();
        assert_eq!(settings.cache_path(), PathBuf::from("/var/cache/klipp.bin"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.transcription.language = "es".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.transcription.language, "es");
    }

    #[test]
    fn test_task_parsing() {
        assert_eq!("Translate".parse::<TranscriptionTask>().unwrap(), TranscriptionTask::Translate);
        assert_eq!("transcribe".parse::<TranscriptionTask>().unwrap(), TranscriptionTask::Transcribe);
        assert!("dub".parse::<TranscriptionTask>().is_err());
    }
}
