//! In-memory chunk store for tests and offline pipelines.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::RagError;

use super::{cosine_similarity, ChunkRecord, ChunkStore, Metadata, SearchResult};

/// Exact-scan store keyed on `(url, chunk_number)`.
///
/// Mirrors the REST backend's upsert and ranking semantics without any I/O:
/// conflicting keys replace the stored row, and searches rank every stored
/// chunk by cosine similarity, skipping zero-norm vectors.
#[derive(Clone, Debug, Default)]
pub struct MemoryChunkStore {
    rows: Arc<RwLock<BTreeMap<(String, usize), ChunkRecord>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert_chunks(&self, rows: Vec<ChunkRecord>) -> Result<(), RagError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut guard = self.rows.write().await;
        for row in rows {
            guard.insert((row.url.clone(), row.chunk_number), row);
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &[f32],
        match_count: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let guard = self.rows.read().await;
        let mut ranked: Vec<SearchResult> = guard
            .values()
            .filter(|row| {
                filter.is_none_or(|filter| {
                    filter
                        .iter()
                        .all(|(key, value)| row.metadata.get(key) == Some(value))
                })
            })
            .filter_map(|row| {
                let similarity = cosine_similarity(query, &row.embedding)?;
                Some(SearchResult {
                    id: None,
                    url: row.url.clone(),
                    source: row.source.clone(),
                    chunk_number: row.chunk_number,
                    content: row.content.clone(),
                    metadata: row.metadata.clone(),
                    similarity,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(match_count);
        Ok(ranked)
    }
}
