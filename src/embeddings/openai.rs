//! OpenAI-compatible embedding client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::EmbedderConfig;
use crate::types::RagError;

use super::EmbeddingProvider;

/// Batch embedding client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Builds a client from resolved configuration.
    ///
    /// Fails with [`RagError::Config`] when the API key is empty.
    pub fn new(config: &EmbedderConfig) -> Result<Self, RagError> {
        if config.api_key.is_empty() {
            return Err(RagError::Config("OPENAI_API_KEY is not set".to_string()));
        }
        let endpoint = config
            .api_base
            .join("embeddings")
            .map_err(|err| RagError::Config(format!("invalid embeddings endpoint: {err}")))?;
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embeddings request failed with {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API is free to reorder items; the index field restores input order.
        let mut ordered: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for item in parsed.data {
            let slot = ordered.get_mut(item.index).ok_or_else(|| {
                RagError::Embedding(format!("embedding index {} out of range", item.index))
            })?;
            *slot = Some(item.embedding);
        }
        ordered
            .into_iter()
            .enumerate()
            .map(|(position, vector)| {
                vector.ok_or_else(|| {
                    RagError::Embedding(format!("no embedding returned for input {position}"))
                })
            })
            .collect()
    }
}
