//! One-time enrichment of a corpus with identifiers and embeddings.

use super::{ChunkStore, Corpus};
use crate::embedding::Embedder;
use crate::error::{KlippError, Result};
use tracing::{info, instrument};

/// Embed every chunk that has no embedding yet and give every chunk without
/// an identifier its position in the corpus as `chunk_id`.
///
/// Identifiers already present must match their position, so ids stay dense
/// and in input order. All pending texts go to the embedder in a single
/// batch. Chunks that are already enriched are returned untouched, so running
/// this twice is a no-op.
#[instrument(skip_all, fields(chunks = corpus.len(), model = embedder.model()))]
pub async fn enrich(mut corpus: Corpus, embedder: &dyn Embedder) -> Result<Corpus> {
    for (idx, chunk) in corpus.iter().enumerate() {
        if let Some(id) = chunk.chunk_id {
            if usize::try_from(id).ok() != Some(idx) {
                return Err(KlippError::Storage(format!(
                    "chunk_id {} at position {} breaks the 0..{} sequence",
                    id,
                    idx,
                    corpus.len()
                )));
            }
        }
    }

    let pending: Vec<usize> = corpus
        .iter()
        .enumerate()
        .filter(|(_, c)| c.embedding.is_none())
        .map(|(idx, _)| idx)
        .collect();

    if !pending.is_empty() {
        let texts: Vec<String> = pending.iter().map(|&idx| corpus[idx].text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != texts.len() {
            return Err(KlippError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let dimension = corpus
            .iter()
            .find_map(|c| c.embedding.as_ref().map(Vec::len))
            .or_else(|| embeddings.first().map(Vec::len))
            .unwrap_or(0);

        if dimension == 0 {
            return Err(KlippError::Embedding("Embedding service returned empty vectors".to_string()));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(KlippError::Embedding(format!(
                "Inconsistent embedding dimension: expected {}, got {}",
                dimension,
                bad.len()
            )));
        }

        for (idx, embedding) in pending.iter().zip(embeddings) {
            corpus[*idx].embedding = Some(embedding);
        }
    }

    let mut assigned = 0;
    for (idx, chunk) in corpus.iter_mut().enumerate() {
        if chunk.chunk_id.is_none() {
            let id = u32::try_from(idx).map_err(|_| {
                KlippError::Storage(format!("Corpus too large for u32 chunk ids ({} chunks)", idx + 1))
            })?;
            chunk.chunk_id = Some(id);
            assigned += 1;
        }
    }

    info!(
        "Added embeddings to {} chunks and ids to {} chunks",
        pending.len(),
        assigned
    );
    Ok(corpus)
}

/// Enrich the corpus held by `store` and write it back.
///
/// The store is only overwritten after every embedding has been computed.
pub async fn enrich_store(store: &ChunkStore, embedder: &dyn Embedder) -> Result<Corpus> {
    let corpus = store.load()?;
    let corpus = enrich(corpus, embedder).await?;
    store.save(&corpus)?;
    info!("Wrote enriched corpus to {}", store.path().display());
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Chunk;
    use crate::test_support::{FailingEmbedder, FixedEmbedder};

    fn raw(text: &str, start: f64) -> Chunk {
        Chunk::new(start, start + 4.0, text.to_string())
    }

    #[tokio::test]
    async fn test_enrich_assigns_ids_in_order_with_one_batch() {
        let embedder = FixedEmbedder::new()
            .with("Van Basten scores", vec![1.0, 0.0])
            .with("Gullit assists", vec![0.0, 1.0])
            .with("Rijkaard defends", vec![0.5, 0.5]);

        let corpus = vec![
            raw("Van Basten scores", 0.0),
            raw("Gullit assists", 4.0),
            raw("Rijkaard defends", 8.0),
        ];

        let enriched = enrich(corpus, &embedder).await.unwrap();

        let ids: Vec<Option<u32>> = enriched.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(enriched[1].embedding, Some(vec![0.0, 1.0]));
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_enrich_is_idempotent() {
        let embedder = FixedEmbedder::new().with_fallback(vec![0.25, 0.75]);
        let corpus = vec![raw("a", 0.0), raw("b", 4.0)];

        let once = enrich(corpus, &embedder).await.unwrap();
        let twice = enrich(once.clone(), &embedder).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_enrich_only_embeds_new_chunks() {
        let embedder = FixedEmbedder::new().with_fallback(vec![1.0, 1.0]);
        let mut existing = raw("old", 0.0);
        existing.chunk_id = Some(0);
        existing.embedding = Some(vec![0.0, 1.0]);

        let enriched = enrich(vec![existing.clone(), raw("new", 4.0)], &embedder)
            .await
            .unwrap();

        assert_eq!(enriched[0], existing);
        assert_eq!(enriched[1].chunk_id, Some(1));
        assert_eq!(*embedder.calls.lock().unwrap(), vec![vec!["new".to_string()]]);
    }

    #[tokio::test]
    async fn test_enrich_rejects_dimension_drift() {
        let embedder = FixedEmbedder::new().with_fallback(vec![1.0, 0.0, 0.0]);
        let mut existing = raw("old", 0.0);
        existing.chunk_id = Some(0);
        existing.embedding = Some(vec![0.0, 1.0]);

        let err = enrich(vec![existing, raw("new", 4.0)], &embedder).await.unwrap_err();
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn test_enrich_rejects_duplicate_ids() {
        let embedder = FixedEmbedder::new().with_fallback(vec![1.0]);
        let mut a = raw("a", 0.0);
        a.chunk_id = Some(0);
        let mut b = raw("b", 4.0);
        b.chunk_id = Some(0);

        assert!(matches!(
            enrich(vec![a, b], &embedder).await,
            Err(KlippError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_enrich_rejects_ids_out_of_position() {
        let embedder = FixedEmbedder::new().with_fallback(vec![1.0, 0.0]);

        let mut late = raw("late", 4.0);
        late.chunk_id = Some(0);
        late.embedding = Some(vec![0.0, 1.0]);
        let err = enrich(vec![raw("first", 0.0), late], &embedder).await.unwrap_err();
        assert!(matches!(err, KlippError::Storage(_)));

        let mut gap = raw("gap", 0.0);
        gap.chunk_id = Some(7);
        let err = enrich(vec![gap, raw("next", 4.0)], &embedder).await.unwrap_err();
        assert!(matches!(err, KlippError::Storage(_)));

        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enrich_rejects_max_id_without_overflow() {
        let embedder = FixedEmbedder::new().with_fallback(vec![1.0]);
        let mut last = raw("last", 0.0);
        last.chunk_id = Some(u32::MAX);

        let err = enrich(vec![last, raw("next", 4.0)], &embedder).await.unwrap_err();
        assert!(matches!(err, KlippError::Storage(_)));
    }

    #[tokio::test]
    async fn test_enrich_appended_chunks_continue_sequence() {
        let embedder = FixedEmbedder::new().with_fallback(vec![0.5, 0.5]);
        let first = enrich(vec![raw("a", 0.0), raw("b", 4.0)], &embedder).await.unwrap();

        let mut corpus = first;
        corpus.push(raw("c", 8.0));
        corpus.push(raw("d", 12.0));
        let enriched = enrich(corpus, &embedder).await.unwrap();

        let ids: Vec<Option<u32>> = enriched.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_enrich_store_writes_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path().join("data.json"));
        store.save(&[raw("a", 0.0), raw("b", 4.0)]).unwrap();

        let embedder = FixedEmbedder::new().with_fallback(vec![0.6, 0.8]);
        enrich_store(&store, &embedder).await.unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.iter().all(Chunk::is_enriched));
    }

    #[tokio::test]
    async fn test_enrich_store_does_not_write_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path().join("data.json"));
        store.save(&[raw("a", 0.0)]).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let err = enrich_store(&store, &FailingEmbedder).await.unwrap_err();

        assert!(err.is_service_error());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }
}
