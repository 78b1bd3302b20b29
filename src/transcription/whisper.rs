//! OpenAI Whisper transcription implementation.

use super::{TranscribeOptions, Transcriber, TranscriptSegment};
use crate::client::create_openai_client_with_timeout;
use crate::config::{Settings, TranscriptionTask};
use crate::error::{KlippError, Result};
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, CreateTranslationRequestArgs,
    CreateTranslationResponseVerboseJson, TimestampGranularity, TranscriptionSegment,
};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber for the given model.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_openai_client_with_timeout(timeout)?,
            model: model.to_string(),
        })
    }

    /// Create a transcriber from the application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.transcription.model,
            Duration::from_secs(settings.service.timeout_seconds),
        )
    }

    async fn audio_input(audio_path: &Path) -> Result<AudioInput> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        Ok(AudioInput::from_vec_u8(file_name, file_bytes))
    }

    /// Translate speech into English text. The endpoint detects the source
    /// language on its own.
    async fn translate(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        let request = CreateTranslationRequestArgs::default()
            .file(Self::audio_input(audio_path).await?)
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| KlippError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .translate_verbose_json(request)
            .await
            .map_err(|e| KlippError::OpenAI(format!("Whisper translation error: {}", e)))?;

        translation_segments(response)
    }

    async fn transcribe_verbatim(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>> {
        let request = CreateTranscriptionRequestArgs::default()
            .file(Self::audio_input(audio_path).await?)
            .model(&self.model)
            .language(language)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Segment])
            .build()
            .map_err(|e| KlippError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| KlippError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(to_segments(response.segments, response.duration as f64, &response.text))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<Vec<TranscriptSegment>> {
        if !audio_path.exists() {
            return Err(KlippError::InvalidInput(format!(
                "Audio file not found: {}",
                audio_path.display()
            )));
        }

        info!(
            "Running Whisper ({}, source language {})",
            options.task, options.language
        );

        let segments = match options.task {
            TranscriptionTask::Translate => self.translate(audio_path).await?,
            TranscriptionTask::Transcribe => {
                self.transcribe_verbatim(audio_path, &options.language).await?
            }
        };

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }
}

/// The translation endpoint reports `duration` as a string.
fn translation_segments(
    response: CreateTranslationResponseVerboseJson,
) -> Result<Vec<TranscriptSegment>> {
    let duration = response.duration.trim().parse::<f64>().map_err(|e| {
        KlippError::Transcription(format!(
            "Invalid duration '{}' in translation response: {}",
            response.duration, e
        ))
    })?;
    Ok(to_segments(response.segments, duration, &response.text))
}

/// Map API segments to ours, or a single segment covering the whole
/// recording when the response has none.
fn to_segments(
    segments: Option<Vec<TranscriptionSegment>>,
    duration: f64,
    text: &str,
) -> Vec<TranscriptSegment> {
    match segments {
        Some(segs) => segs
            .iter()
            .map(|s| TranscriptSegment::new(s.start as f64, s.end as f64, s.text.trim().to_string()))
            .collect(),
        None => vec![TranscriptSegment::new(0.0, duration, text.trim().to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_to_single_segment() {
        let segments = to_segments(None, 42.5, "  whole recording  ");
        assert_eq!(
            segments,
            vec![TranscriptSegment::new(0.0, 42.5, "whole recording".to_string())]
        );
    }

    fn api_segment(id: i32, start: f32, end: f32, text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "seek": 0,
            "start": start,
            "end": end,
            "text": text,
            "tokens": [],
            "temperature": 0.0,
            "avg_logprob": -0.2,
            "compression_ratio": 1.1,
            "no_speech_prob": 0.01
        })
    }

    fn translation(value: serde_json::Value) -> CreateTranslationResponseVerboseJson {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_translation_response_maps_segments() {
        let response = translation(serde_json::json!({
            "language": "english",
            "duration": "12.5",
            "text": "Van Basten scores. Gullit celebrates.",
            "segments": [
                api_segment(0, 0.0, 6.0, " Van Basten scores. "),
                api_segment(1, 6.0, 12.5, " Gullit celebrates."),
            ]
        }));

        let segments = translation_segments(response).unwrap();
        assert_eq!(
            segments,
            vec![
                TranscriptSegment::new(0.0, 6.0, "Van Basten scores.".to_string()),
                TranscriptSegment::new(6.0, 12.5, "Gullit celebrates.".to_string()),
            ]
        );
    }

    #[test]
    fn test_translation_without_segments_uses_string_duration() {
        let response = translation(serde_json::json!({
            "language": "english",
            "duration": "42.5",
            "text": " whole recording "
        }));

        let segments = translation_segments(response).unwrap();
        assert_eq!(
            segments,
            vec![TranscriptSegment::new(0.0, 42.5, "whole recording".to_string())]
        );
    }

    #[test]
    fn test_translation_with_bad_duration() {
        let response = translation(serde_json::json!({
            "language": "english",
            "duration": "soon",
            "text": "text"
        }));

        assert!(matches!(
            translation_segments(response),
            Err(KlippError::Transcription(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_audio_file() {
        let transcriber = WhisperTranscriber::new("whisper-1", Duration::from_secs(1)).unwrap();
        let err = transcriber
            .transcribe(Path::new("/nonexistent/clip.mp3"), &TranscribeOptions::translate("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, KlippError::InvalidInput(_)));
    }
}
