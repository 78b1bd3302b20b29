//! Binary embedding cache.
//!
//! The cache holds an enriched corpus in a form that loads without parsing
//! thousands of JSON floats. Layout, all integers little-endian:
//!
//! ```text
//! "KLPC" | u32 version | u32 header_len | header JSON | count * dimension f32
//! ```
//!
//! The header carries every chunk field except the embedding; embeddings
//! follow as one flat block in record order.

use super::{write_atomic, Chunk, ChunkStore, Corpus, EnrichedChunk};
use crate::error::{KlippError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

const MAGIC: &[u8; 4] = b"KLPC";
const VERSION: u32 = 1;
const PREAMBLE_LEN: usize = 12;
const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

#[derive(Debug, Serialize, Deserialize)]
struct CacheHeader {
    dimension: usize,
    count: usize,
    created_at: DateTime<Utc>,
    records: Vec<CacheRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    title: Option<String>,
    number: Option<u32>,
    text: String,
    start: f64,
    end: f64,
    chunk_id: u32,
}

/// Fast-loading copy of the enriched corpus, backed by the chunk store.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    path: PathBuf,
    store: ChunkStore,
}

impl EmbeddingCache {
    /// Create a cache at `path` that falls back to `store` on a miss.
    pub fn new(path: impl Into<PathBuf>, store: ChunkStore) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The chunk store used on a cache miss.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Whether the cache file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the corpus, preferring the cache.
    ///
    /// A missing or unreadable cache is not an error: the raw chunk store is
    /// returned instead, exactly as stored, which may be un-enriched. Only a
    /// failure of that fallback is reported.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Corpus> {
        match self.read() {
            Ok(chunks) => {
                info!("Loaded {} embeddings from cache", chunks.len());
                Ok(chunks.into_iter().map(Chunk::from).collect())
            }
            Err(KlippError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No cached embeddings found, loading chunk store");
                self.store.load()
            }
            Err(e) => {
                warn!("Ignoring unreadable embedding cache: {}", e);
                self.store.load()
            }
        }
    }

    /// Read and decode the cache file without any fallback.
    pub fn read(&self) -> Result<Vec<EnrichedChunk>> {
        let bytes = std::fs::read(&self.path)?;
        decode(&bytes)
    }

    /// Replace the cache with the given chunks.
    ///
    /// This is an offline step; the query path only ever reads the cache.
    #[instrument(skip(self, chunks), fields(path = %self.path.display(), count = chunks.len()))]
    pub fn write(&self, chunks: &[EnrichedChunk]) -> Result<()> {
        let bytes = encode(chunks)?;
        write_atomic(&self.path, &bytes)?;
        info!("Wrote {} embeddings to cache", chunks.len());
        Ok(())
    }

    /// Remove the cache file. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode(chunks: &[EnrichedChunk]) -> Result<Vec<u8>> {
    let dimension = chunks.first().map_or(0, |c| c.embedding.len());
    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
        return Err(KlippError::DimensionMismatch {
            expected: dimension,
            actual: bad.embedding.len(),
        });
    }

    let header = CacheHeader {
        dimension,
        count: chunks.len(),
        created_at: Utc::now(),
        records: chunks
            .iter()
            .map(|c| CacheRecord {
                title: c.title.clone(),
                number: c.number,
                text: c.text.clone(),
                start: c.start,
                end: c.end,
                chunk_id: c.chunk_id,
            })
            .collect(),
    };
    let header_json = serde_json::to_vec(&header)?;
    let header_len = u32::try_from(header_json.len())
        .map_err(|_| KlippError::Cache("Header too large".to_string()))?;

    let mut buffer =
        Vec::with_capacity(PREAMBLE_LEN + header_json.len() + chunks.len() * dimension * FLOAT_SIZE);
    buffer.extend_from_slice(MAGIC);
    buffer.extend_from_slice(&VERSION.to_le_bytes());
    buffer.extend_from_slice(&header_len.to_le_bytes());
    buffer.extend_from_slice(&header_json);
    for chunk in chunks {
        for &value in &chunk.embedding {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }

    Ok(buffer)
}

fn decode(bytes: &[u8]) -> Result<Vec<EnrichedChunk>> {
    if bytes.len() < PREAMBLE_LEN || &bytes[..4] != MAGIC {
        return Err(KlippError::Cache("Not an embedding cache file".to_string()));
    }

    let version = read_u32(bytes, 4)?;
    if version != VERSION {
        return Err(KlippError::Cache(format!(
            "Unsupported cache version {} (expected {})",
            version, VERSION
        )));
    }

    let header_len = read_u32(bytes, 8)? as usize;
    let header_bytes = bytes
        .get(PREAMBLE_LEN..PREAMBLE_LEN + header_len)
        .ok_or_else(|| KlippError::Cache("Truncated header".to_string()))?;
    let header: CacheHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| KlippError::Cache(format!("Failed to parse header: {}", e)))?;

    if header.records.len() != header.count {
        return Err(KlippError::Cache(format!(
            "Header lists {} records but declares {}",
            header.records.len(),
            header.count
        )));
    }

    let payload = &bytes[PREAMBLE_LEN + header_len..];
    let expected_len = header
        .count
        .checked_mul(header.dimension)
        .and_then(|n| n.checked_mul(FLOAT_SIZE))
        .ok_or_else(|| KlippError::Cache("Declared size overflows".to_string()))?;
    if payload.len() != expected_len {
        return Err(KlippError::Cache(format!(
            "Embedding block is {} bytes, expected {}",
            payload.len(),
            expected_len
        )));
    }

    let values: Vec<f32> = payload
        .chunks_exact(FLOAT_SIZE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let chunks = header
        .records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let offset = idx * header.dimension;
            EnrichedChunk {
                title: record.title,
                number: record.number,
                text: record.text,
                start: record.start,
                end: record.end,
                chunk_id: record.chunk_id,
                embedding: values[offset..offset + header.dimension].to_vec(),
            }
        })
        .collect();

    Ok(chunks)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| KlippError::Cache("Truncated preamble".to_string()))
}
