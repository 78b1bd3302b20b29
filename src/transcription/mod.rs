//! Transcription module for Klipp.
//!
//! Turns an audio file into timestamped segments with OpenAI Whisper. The
//! segments become the initial contents of the chunk store; transcription is
//! an offline step and never runs while answering questions.

mod models;
mod whisper;

pub use models::{TranscribeOptions, TranscriptSegment};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use crate::store::{Chunk, Corpus};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into segment-level timestamped text.
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<Vec<TranscriptSegment>>;
}

/// Transcribe `audio_path` and turn every segment into an un-enriched chunk.
pub async fn transcribe_to_corpus(
    transcriber: &dyn Transcriber,
    audio_path: &Path,
    options: &TranscribeOptions,
) -> Result<Corpus> {
    let segments = transcriber.transcribe(audio_path, options).await?;
    info!("Transcribed {} segments", segments.len());
    Ok(segments.into_iter().map(Chunk::from).collect())
}
