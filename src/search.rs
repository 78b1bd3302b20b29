//! Similarity search over an enriched corpus.

use crate::error::{KlippError, Result};
use crate::store::EnrichedChunk;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Number of chunks returned when the caller doesn't ask for a specific count.
pub const DEFAULT_TOP_K: usize = 50;

/// A chunk together with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    /// The matched chunk.
    pub chunk: EnrichedChunk,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

impl RankedChunk {
    /// Format the chunk start for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.chunk.start)
    }
}

/// Chunks ordered by descending similarity to a query.
pub type RankedResult = Vec<RankedChunk>;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank `corpus` by cosine similarity to `query_embedding` and keep the best `top_k`.
///
/// Ties keep corpus order. Every chunk must have the query's dimension,
/// otherwise nothing is ranked and `DimensionMismatch` is returned.
#[instrument(skip_all, fields(corpus = corpus.len(), top_k = top_k))]
pub fn search(
    query_embedding: &[f32],
    corpus: &[EnrichedChunk],
    top_k: usize,
) -> Result<RankedResult> {
    let expected = query_embedding.len();
    if let Some(bad) = corpus.iter().find(|c| c.embedding.len() != expected) {
        return Err(KlippError::DimensionMismatch {
            expected,
            actual: bad.embedding.len(),
        });
    }

    let mut results: Vec<RankedChunk> = corpus
        .iter()
        .map(|chunk| RankedChunk {
            score: cosine_similarity(query_embedding, &chunk.embedding),
            chunk: chunk.clone(),
        })
        .collect();

    // Stable sort; NaN scores sink to the bottom.
    results.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
    results.truncate(top_k);

    debug!("Ranked {} of {} chunks", results.len(), corpus.len());
    Ok(results)
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
