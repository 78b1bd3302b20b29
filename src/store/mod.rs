//! Chunk store for Klipp.
//!
//! A corpus is a flat JSON array of transcript chunks. Chunks come out of
//! transcription without an identifier or embedding; the enrichment step
//! fills both in and writes the corpus back to the same file.

pub mod cache;
mod enrich;

pub use cache::EmbeddingCache;
pub use enrich::{enrich, enrich_store};

use crate::error::{KlippError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// A timestamped piece of transcript text.
///
/// `chunk_id` and `embedding` are only present once the chunk has been
/// enriched. Unset optional fields are left out of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Title of the video this chunk belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordinal of the video within the library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Transcribed text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Stable identifier, assigned at enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<u32>,
    /// Embedding of `text`, assigned at enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create an un-enriched chunk from a transcript segment.
    pub fn new(start: f64, end: f64, text: String) -> Self {
        Self {
            title: None,
            number: None,
            text,
            start,
            end,
            chunk_id: None,
            embedding: None,
        }
    }

    /// Whether both the identifier and the embedding are present.
    pub fn is_enriched(&self) -> bool {
        self.chunk_id.is_some() && self.embedding.is_some()
    }
}

/// The ordered collection of chunks for one session.
pub type Corpus = Vec<Chunk>;

/// A chunk that is guaranteed to carry an identifier and an embedding.
///
/// Only enriched chunks can be searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedChunk {
    pub title: Option<String>,
    pub number: Option<u32>,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub chunk_id: u32,
    pub embedding: Vec<f32>,
}

impl EnrichedChunk {
    /// Title for display, falling back to a placeholder for untitled chunks.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

impl TryFrom<Chunk> for EnrichedChunk {
    type Error = KlippError;

    fn try_from(chunk: Chunk) -> Result<Self> {
        let (chunk_id, embedding) = match (chunk.chunk_id, chunk.embedding) {
            (Some(id), Some(embedding)) => (id, embedding),
            (None, _) => {
                return Err(KlippError::NotEnriched(format!(
                    "chunk at {:.2}s has no chunk_id",
                    chunk.start
                )))
            }
            (Some(id), None) => {
                return Err(KlippError::NotEnriched(format!(
                    "chunk {} has no embedding",
                    id
                )))
            }
        };

        Ok(Self {
            title: chunk.title,
            number: chunk.number,
            text: chunk.text,
            start: chunk.start,
            end: chunk.end,
            chunk_id,
            embedding,
        })
    }
}

impl From<EnrichedChunk> for Chunk {
    fn from(chunk: EnrichedChunk) -> Self {
        Self {
            title: chunk.title,
            number: chunk.number,
            text: chunk.text,
            start: chunk.start,
            end: chunk.end,
            chunk_id: Some(chunk.chunk_id),
            embedding: Some(chunk.embedding),
        }
    }
}

/// Convert a whole corpus into its enriched form, failing on the first
/// chunk that is missing its identifier or embedding.
pub fn into_enriched(corpus: Corpus) -> Result<Vec<EnrichedChunk>> {
    corpus.into_iter().map(EnrichedChunk::try_from).collect()
}

/// Flat-file storage for a corpus.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    path: PathBuf,
}

impl ChunkStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the corpus from disk.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Corpus> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            KlippError::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let corpus: Corpus = serde_json::from_str(&content).map_err(|e| {
            KlippError::Storage(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        validate(&corpus)?;

        debug!("Loaded {} chunks", corpus.len());
        Ok(corpus)
    }

    /// Overwrite the store with the given corpus.
    ///
    /// The file is replaced atomically, so a failed write leaves the old
    /// contents in place.
    #[instrument(skip(self, corpus), fields(path = %self.path.display(), count = corpus.len()))]
    pub fn save(&self, corpus: &[Chunk]) -> Result<()> {
        let json = to_pretty_json(corpus)?;
        write_atomic(&self.path, &json)?;
        debug!("Wrote {} chunks", corpus.len());
        Ok(())
    }

    /// Append chunks to the store, creating it if it doesn't exist yet.
    /// Returns the new corpus size.
    pub fn append(&self, chunks: Corpus) -> Result<usize> {
        let mut corpus = if self.exists() { self.load()? } else { Vec::new() };
        corpus.extend(chunks);
        self.save(&corpus)?;
        Ok(corpus.len())
    }
}

/// Check the per-chunk invariants that the rest of the pipeline relies on.
fn validate(corpus: &[Chunk]) -> Result<()> {
    for (idx, chunk) in corpus.iter().enumerate() {
        if chunk.start > chunk.end {
            return Err(KlippError::Storage(format!(
                "Chunk {} ends ({:.2}s) before it starts ({:.2}s)",
                idx, chunk.end, chunk.start
            )));
        }
    }
    Ok(())
}

/// Serialize as human-readable JSON with four-space indentation.
/// Non-ASCII text is written as-is.
pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Write `bytes` to `path` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| KlippError::Io(e.error))?;
    Ok(())
}
