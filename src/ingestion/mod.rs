//! Ingestion orchestration: files in, embedded chunk rows out.
//!
//! ```text
//! paths ──► extract::load_text ──► chunking::chunk_text ──► EmbeddingProvider
//!                                                                │
//!                         ChunkStore::upsert_chunks ◄── rows ◄───┘
//! ```
//!
//! Files that are missing, unreadable, or extract to nothing are skipped
//! silently; rows from all surviving files accumulate into a single bulk
//! upsert at the end of the run.

pub mod extract;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunking::{chunk_text, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkRecord, ChunkStore, Metadata, MetadataValue};
use crate::types::RagError;

/// Knobs for an ingestion run.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Source label stored with every chunk; defaults to each file's name.
    pub source: Option<String>,
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source: None,
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Ingests local files into the chunk store.
///
/// Each file is extracted, chunked, and embedded in one ordered batch; chunk
/// numbers run from 0 per document and the document identity is a `file://`
/// URL derived from the canonical path, so re-ingesting a file overwrites its
/// previous chunks. Returns the total number of chunks written.
pub async fn ingest_paths(
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
    paths: &[PathBuf],
    options: &IngestOptions,
) -> Result<usize, RagError> {
    let mut rows: Vec<ChunkRecord> = Vec::new();
    let mut total = 0usize;

    for path in paths {
        let Some(url) = file_url(path).await else {
            debug!(path = %path.display(), "skipping path that is not a regular file");
            continue;
        };

        let text = match extract::load_text(path).await {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        let chunks = chunk_text(&text, options.max_chars, options.overlap);
        if chunks.is_empty() {
            debug!(path = %path.display(), "file produced no chunks");
            continue;
        }

        let embeddings = embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let source = options
            .source
            .clone()
            .unwrap_or_else(|| file_name(path));
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), MetadataValue::from(source.clone()));

        total += chunks.len();
        rows.extend(chunks.into_iter().zip(embeddings).enumerate().map(
            |(chunk_number, (content, embedding))| ChunkRecord {
                url: url.clone(),
                source: source.clone(),
                chunk_number,
                content,
                metadata: metadata.clone(),
                embedding,
            },
        ));
    }

    if !rows.is_empty() {
        store.upsert_chunks(rows).await?;
    }
    info!(chunks = total, "ingestion complete");
    Ok(total)
}

/// Canonical `file://` identity for a regular file, `None` otherwise.
async fn file_url(path: &Path) -> Option<String> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let canonical = tokio::fs::canonicalize(path).await.ok()?;
    Some(format!("file://{}", canonical.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
