//! Embedding providers.
//!
//! The pipeline treats embedding generation as an opaque, order-preserving
//! batch function behind the [`EmbeddingProvider`] trait. Two implementations
//! ship with the crate:
//!
//! * [`OpenAiEmbedder`] — a reqwest client for OpenAI-compatible
//!   `/embeddings` endpoints.
//! * [`MockEmbeddingProvider`] — deterministic hash-derived vectors for tests
//!   and offline runs.

pub mod openai;

use async_trait::async_trait;

use crate::types::RagError;

pub use openai::OpenAiEmbedder;

/// Order-preserving batch embedding.
///
/// Implementations must return exactly one vector per input text, in input
/// order, and an empty vector for an empty batch.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Deterministic embedding provider for tests and offline pipelines.
///
/// Vectors are derived from a hash of the input text, so identical texts map
/// to identical vectors and different texts almost always differ.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut state = {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            hasher.finish()
        };

        (0..self.dimensions)
            .map(|_| {
                // xorshift64 keeps each dimension cheap and reproducible.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 2000) as f32 / 1000.0 - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
