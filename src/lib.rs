//! ```text
//! Files (txt/pdf) ──► ingestion::extract ──► chunking::chunk_text
//!                                                   │
//!                              EmbeddingProvider ◄──┘
//!                                     │
//!                                     ▼
//!                    stores::ChunkStore::upsert_chunks
//!
//! Query ──► EmbeddingProvider ──► stores::ChunkStore::similarity_search
//!                                          │
//!            retrieval::prefer_uploaded ◄──┘
//!                        │
//!                        ▼
//!            retrieval::render_with_citations ──► grounded answer
//! ```
//!
//! A retrieval-augmented generation pipeline: documents are split into
//! overlapping character windows, embedded, and upserted into a
//! vector-searchable table; at query time the most similar chunks are
//! retrieved (preferring user-uploaded documents) to ground an answer with
//! citations. The LLM itself, the UI, and the datastore internals are
//! external collaborators.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::chunk_text;
pub use config::{EmbedderConfig, RagConfig, StoreConfig};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbedder};
pub use ingestion::{ingest_paths, IngestOptions};
pub use retrieval::{prefer_uploaded, render_with_citations, search_knowledge_base};
pub use stores::{
    ChunkRecord, ChunkStore, MemoryChunkStore, Metadata, MetadataValue, RestChunkStore,
    SearchResult,
};
pub use types::RagError;
