//! Query-time retrieval: similarity search plus result shaping.
//!
//! Raw search results are post-processed to prefer chunks that came from
//! user-uploaded documents over the larger background corpus. When none of
//! the results are uploaded documents the unfiltered set is returned instead,
//! so the caller still gets an answer grounded in whatever matched.

pub mod citations;

use tracing::warn;

use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkStore, SearchResult};

pub use citations::render_with_citations;

/// Label marking chunks ingested through the upload channel.
pub const UPLOAD_SOURCE: &str = "upload";

/// Returns `true` when a result originated from an uploaded document.
///
/// Uploads are recognized by a `file://` URL, a `source` column of `upload`,
/// or a metadata `source` of `upload`.
pub fn is_uploaded(row: &SearchResult) -> bool {
    row.url.starts_with("file://")
        || row.source == UPLOAD_SOURCE
        || row
            .metadata
            .get("source")
            .and_then(|value| value.as_str())
            .is_some_and(|value| value == UPLOAD_SOURCE)
}

/// Keeps rows satisfying `preferred`, falling back to the full set when no
/// row does. The output is truncated to `k` either way.
pub fn prefer_where<F>(rows: Vec<SearchResult>, preferred: F, k: usize) -> Vec<SearchResult>
where
    F: Fn(&SearchResult) -> bool,
{
    let mut preferred_rows: Vec<SearchResult> = rows.iter().filter(|row| preferred(row)).cloned().collect();
    if preferred_rows.is_empty() {
        preferred_rows = rows;
    }
    preferred_rows.truncate(k);
    preferred_rows
}

/// [`prefer_where`] specialised to uploaded documents.
pub fn prefer_uploaded(rows: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    prefer_where(rows, is_uploaded, k)
}

/// Embeds `query` and returns up to `k` chunks, preferring uploaded documents.
///
/// Searches with double the requested count so the preference filter has
/// headroom. Runtime failures degrade to an empty result; retrieval is
/// advisory and never aborts the caller.
pub async fn search_knowledge_base(
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
    query: &str,
    k: usize,
) -> Vec<SearchResult> {
    let embedding = match embedder.embed_batch(&[query.to_string()]).await {
        Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
        Ok(_) => {
            warn!("embedder returned no vector for the query");
            return Vec::new();
        }
        Err(err) => {
            warn!(error = %err, "query embedding failed");
            return Vec::new();
        }
    };

    let rows = match store.similarity_search(&embedding, k * 2, None).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "similarity search failed");
            return Vec::new();
        }
    };

    prefer_uploaded(rows, k)
}
