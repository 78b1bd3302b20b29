//! Data models for transcription.

use crate::config::{TranscriptionSettings, TranscriptionTask};
use crate::store::Chunk;
use serde::{Deserialize, Serialize};

/// Options for a transcription request.
///
/// Timestamps are always requested per segment, never per word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    /// Source language of the audio (ISO-639-1).
    pub language: String,
    /// Translate to English or transcribe as-is.
    pub task: TranscriptionTask,
}

impl TranscribeOptions {
    /// Translate `language` audio into English text.
    pub fn translate(language: &str) -> Self {
        Self {
            language: language.to_string(),
            task: TranscriptionTask::Translate,
        }
    }

    /// Options from the configured defaults.
    pub fn from_settings(settings: &TranscriptionSettings) -> Self {
        Self {
            language: settings.language.clone(),
            task: settings.task,
        }
    }
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start: f64, end: f64, text: String) -> Self {
        Self { start, end, text }
    }
}

impl From<TranscriptSegment> for Chunk {
    fn from(segment: TranscriptSegment) -> Self {
        let end = segment.end.max(segment.start);
        Chunk::new(segment.start, end, segment.text.trim().to_string())
    }
}
