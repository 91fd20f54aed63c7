//! Chunk storage backends.
//!
//! The [`ChunkStore`] trait abstracts over concrete backends so the ingestion
//! and retrieval layers never depend on a specific datastore:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │  ChunkStore      │
//!                  │  (async upsert + │
//!                  │   search)        │
//!                  └────────┬─────────┘
//!                           │
//!                ┌──────────┴──────────┐
//!                ▼                     ▼
//!        ┌───────────────┐    ┌─────────────────┐
//!        │ RestChunkStore│    │ MemoryChunkStore│
//!        │ (PostgREST)   │    │ (tests/offline) │
//!        └───────────────┘    └─────────────────┘
//! ```
//!
//! Upserts are keyed on `(url, chunk_number)`: re-ingesting a document at the
//! same chunk position replaces the row instead of duplicating it. Search is
//! advisory — once a store is constructed, `similarity_search` degrades to an
//! empty result rather than surfacing backend failures to callers.

pub mod memory;
pub mod rest;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use memory::MemoryChunkStore;
pub use rest::RestChunkStore;

/// Open per-chunk attribute value, restricted to a small closed set of kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl MetadataValue {
    /// Rendering used for equality filters on the wire.
    pub fn as_filter_string(&self) -> String {
        match self {
            MetadataValue::String(value) => value.clone(),
            MetadataValue::Number(value) => value.to_string(),
            MetadataValue::Bool(value) => value.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

/// Per-chunk attribute map, also used as the equality filter for searches.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// The atomic retrievable unit: one embedded window of a source document.
///
/// `(url, chunk_number)` uniquely identifies a chunk; `embedding` aligns
/// index-for-index with `content`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Identity of the originating document, e.g. a `file://` path.
    pub url: String,
    /// Ingestion channel label, e.g. "upload" or a file name.
    pub source: String,
    /// Zero-based position of this chunk within its document.
    pub chunk_number: usize,
    /// Trimmed, non-empty chunk text.
    pub content: String,
    /// Open attribute map; always carries at least a `source` label.
    pub metadata: Metadata,
    /// Embedding vector for `content`.
    pub embedding: Vec<f32>,
}

/// A stored chunk returned from a similarity search, with its score attached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    /// Store-assigned row id, when the backend exposes one.
    pub id: Option<i64>,
    pub url: String,
    pub source: String,
    pub chunk_number: usize,
    pub content: String,
    pub metadata: Metadata,
    /// Cosine similarity to the query, higher is more relevant.
    pub similarity: f32,
}

/// Unified interface over chunk storage backends.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Bulk upsert keyed on `(url, chunk_number)`. No-op on empty input.
    ///
    /// A rejected write due to insufficient privilege surfaces as
    /// [`RagError::WriteAuthorization`]; other persistence failures as
    /// [`RagError::Storage`].
    async fn upsert_chunks(&self, rows: Vec<ChunkRecord>) -> Result<(), RagError>;

    /// Returns up to `match_count` stored chunks ordered by similarity
    /// descending. Backend failures degrade to `Ok(vec![])`.
    async fn similarity_search(
        &self,
        query: &[f32],
        match_count: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, RagError>;
}

/// Cosine similarity between two vectors.
///
/// Returns `None` when the vectors differ in length, are empty, or either has
/// zero norm (the similarity is undefined there, and callers must skip such
/// rows rather than divide by zero).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((dot / denom) as f32)
}
