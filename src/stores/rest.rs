//! PostgREST-backed chunk store (Supabase).
//!
//! Similarity search runs through an ordered sequence of strategies:
//!
//! 1. Direct table scan with in-process cosine ranking. The whole table
//!    (optionally pre-filtered server-side with equality filters) is fetched
//!    and ranked locally. O(table size) per query, which is the documented
//!    contract for this backend: it trades efficiency for availability when
//!    the datastore's native ranking is absent or unreliable.
//! 2. Remote ranking procedures, tried under a fixed list of historical
//!    names; the first one that answers wins.
//! 3. An empty result. Search is advisory, so callers always receive a
//!    well-typed (possibly empty) list, never a propagated backend failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::config::StoreConfig;
use crate::types::RagError;

use super::{cosine_similarity, ChunkRecord, ChunkStore, Metadata, MetadataValue, SearchResult};

/// Remote ranking procedures, in the order they are attempted.
const RPC_CANDIDATES: [&str; 3] = ["match_all_chunks", "match_crawled_pages", "match_code_examples"];

/// Chunk store speaking the PostgREST wire protocol.
#[derive(Clone, Debug)]
pub struct RestChunkStore {
    client: Client,
    config: StoreConfig,
}

impl RestChunkStore {
    pub fn new(config: StoreConfig) -> Result<Self, RagError> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self { client, config })
    }

    fn table_endpoint(&self) -> Result<Url, RagError> {
        self.config
            .url
            .join(&format!("rest/v1/{}", self.config.table))
            .map_err(|err| RagError::Storage(format!("invalid table endpoint: {err}")))
    }

    fn rpc_endpoint(&self, name: &str) -> Result<Url, RagError> {
        self.config
            .url
            .join(&format!("rest/v1/rpc/{name}"))
            .map_err(|err| RagError::Storage(format!("invalid rpc endpoint: {err}")))
    }

    /// Tier 1: fetch the table and rank rows in-process.
    async fn scan_and_rank(
        &self,
        query: &[f32],
        match_count: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let key = self.config.read_key()?;
        let mut request = self
            .client
            .get(self.table_endpoint()?)
            .header("apikey", key)
            .bearer_auth(key)
            .query(&[("select", "*")]);
        if let Some(filter) = filter {
            for (column, value) in filter {
                request = request.query(&[(column.as_str(), format!("eq.{}", value.as_filter_string()))]);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Storage(format!(
                "table scan failed with {status}: {body}"
            )));
        }

        // Rows are decoded individually so one malformed row cannot sink the batch.
        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let mut ranked: Vec<SearchResult> = Vec::new();
        for value in raw {
            let row: StoredRow = match serde_json::from_value(value) {
                Ok(row) => row,
                Err(err) => {
                    debug!(error = %err, "skipping undecodable row");
                    continue;
                }
            };
            let Some(embedding) = row.embedding.clone().and_then(EmbeddingField::into_vector)
            else {
                debug!(url = %row.url, chunk = row.chunk_number, "skipping row without usable embedding");
                continue;
            };
            let Some(similarity) = cosine_similarity(query, &embedding) else {
                continue;
            };
            ranked.push(row.into_result(similarity));
        }

        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(match_count);
        Ok(ranked)
    }

    /// Tier 2: ask a named server-side ranking procedure.
    async fn remote_rank(
        &self,
        procedure: &str,
        query: &[f32],
        match_count: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let key = self.config.read_key()?;
        let payload = json!({
            "query_embedding": query,
            "match_count": match_count,
            "filter": filter.cloned().unwrap_or_default(),
        });

        let response = self
            .client
            .post(self.rpc_endpoint(procedure)?)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Storage(format!(
                "rpc {procedure} failed with {status}: {body}"
            )));
        }

        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let results = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<StoredRow>(value) {
                Ok(row) => {
                    let similarity = row.similarity.unwrap_or(0.0);
                    Some(row.into_result(similarity))
                }
                Err(err) => {
                    debug!(error = %err, "skipping undecodable rpc row");
                    None
                }
            })
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl ChunkStore for RestChunkStore {
    async fn upsert_chunks(&self, rows: Vec<ChunkRecord>) -> Result<(), RagError> {
        if rows.is_empty() {
            return Ok(());
        }

        let key = self.config.write_key()?;
        let response = self
            .client
            .post(self.table_endpoint()?)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "url,chunk_number")])
            .json(&rows)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::WriteAuthorization {
                reason: format!("{status}: {body}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Storage(format!(
                "upsert failed with {status}: {body}"
            )));
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &[f32],
        match_count: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, RagError> {
        match self.scan_and_rank(query, match_count, filter).await {
            Ok(results) if !results.is_empty() => return Ok(results),
            Ok(_) => debug!("table scan produced no matches, trying remote ranking"),
            Err(err) => warn!(error = %err, "table scan failed, trying remote ranking"),
        }

        for procedure in RPC_CANDIDATES {
            match self.remote_rank(procedure, query, match_count, filter).await {
                Ok(results) => return Ok(results),
                Err(err) => {
                    debug!(procedure, error = %err, "remote ranking candidate unavailable")
                }
            }
        }

        Ok(Vec::new())
    }
}

/// Wire representation of a stored row.
///
/// PostgREST deployments differ in how they serialize vectors and metadata,
/// so both fields tolerate native and stringified forms.
#[derive(Clone, Debug, Deserialize)]
struct StoredRow {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default, deserialize_with = "deserialize_chunk_number")]
    chunk_number: usize,
    #[serde(default)]
    content: String,
    #[serde(default, deserialize_with = "deserialize_metadata_field")]
    metadata: Metadata,
    #[serde(default)]
    embedding: Option<EmbeddingField>,
    #[serde(default)]
    similarity: Option<f32>,
}

impl StoredRow {
    fn into_result(self, similarity: f32) -> SearchResult {
        SearchResult {
            id: self.id,
            url: self.url,
            source: self.source,
            chunk_number: self.chunk_number,
            content: self.content,
            metadata: self.metadata,
            similarity,
        }
    }
}

/// An embedding as stored: either a native numeric array or a serialized
/// textual form such as `"[0.1,0.2]"`.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingField {
    Vector(Vec<f32>),
    Text(String),
}

impl EmbeddingField {
    /// Decodes into a numeric vector, `None` when the payload is unusable.
    fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingField::Vector(vector) => Some(vector),
            EmbeddingField::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let bracketed;
                let candidate = if trimmed.starts_with('[') {
                    trimmed
                } else {
                    bracketed = format!("[{trimmed}]");
                    &bracketed
                };
                serde_json::from_str::<Vec<f32>>(candidate).ok()
            }
        }
    }
}

fn deserialize_chunk_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => usize::try_from(value)
            .map_err(|_| de::Error::custom(format!("chunk_number {value} does not fit in usize"))),
        Repr::Text(text) => text.parse::<usize>().map_err(|err| {
            de::Error::custom(format!("unable to parse chunk_number '{text}': {err}"))
        }),
    }
}

fn deserialize_metadata_field<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let value = match value {
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        }
        other => other,
    };
    Ok(metadata_from_value(value))
}

/// Keeps only attribute values representable in the closed metadata kinds.
fn metadata_from_value(value: serde_json::Value) -> Metadata {
    let serde_json::Value::Object(map) = value else {
        return Metadata::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| {
            let converted = match value {
                serde_json::Value::String(text) => MetadataValue::String(text),
                serde_json::Value::Number(number) => MetadataValue::Number(number.as_f64()?),
                serde_json::Value::Bool(flag) => MetadataValue::Bool(flag),
                _ => return None,
            };
            Some((key, converted))
        })
        .collect()
}
