//! Configuration module for Klipp.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings, QuerySettings,
    ServiceSettings, Settings, StoreSettings, TranscriptionSettings, TranscriptionTask,
};
