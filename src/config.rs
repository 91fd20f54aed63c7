//! Process-wide configuration for the embedding and storage backends.
//!
//! Configuration is resolved once, at process start, into explicit structs
//! that are handed to the components that need them. Library code never reads
//! the environment on its own.

use std::env;

use url::Url;

use crate::types::RagError;

/// Default embedding model when `EMBED_MODEL` is not set.
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";

/// Default table name for stored chunks.
pub const DEFAULT_TABLE: &str = "rag_pages";

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// Connection settings for the chunk store.
///
/// The service-role key authorizes writes; the anon key is enough for reads.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub url: Url,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
    pub table: String,
}

impl StoreConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            service_role_key: None,
            anon_key: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Key used for writes. Requires the service-role key.
    pub fn write_key(&self) -> Result<&str, RagError> {
        self.service_role_key.as_deref().ok_or_else(|| {
            RagError::Config(
                "no write-capable store key; set SUPABASE_SERVICE_ROLE_KEY".to_string(),
            )
        })
    }

    /// Key used for reads. Prefers the service-role key, falls back to anon.
    pub fn read_key(&self) -> Result<&str, RagError> {
        self.service_role_key
            .as_deref()
            .or(self.anon_key.as_deref())
            .ok_or_else(|| {
                RagError::Config(
                    "no store key; set SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY".to_string(),
                )
            })
    }
}

/// Settings for the embedding provider.
#[derive(Clone, Debug)]
pub struct EmbedderConfig {
    pub api_base: Url,
    pub api_key: String,
    pub model: String,
}

/// Top-level configuration, resolved once from the environment.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub store: StoreConfig,
    pub embedder: EmbedderConfig,
}

impl RagConfig {
    /// Loads configuration from the environment, reading `.env` first.
    ///
    /// Required: `SUPABASE_URL`, one of `SUPABASE_SERVICE_ROLE_KEY` /
    /// `SUPABASE_ANON_KEY` / `SUPABASE_KEY` (legacy alias for anon), and
    /// `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();

        let store_url = env::var("SUPABASE_URL")
            .map_err(|_| RagError::Config("SUPABASE_URL is not set".to_string()))?;
        let store_url = Url::parse(&store_url)
            .map_err(|err| RagError::Config(format!("invalid SUPABASE_URL: {err}")))?;

        let service_role_key = non_empty_var("SUPABASE_SERVICE_ROLE_KEY");
        let anon_key = non_empty_var("SUPABASE_ANON_KEY").or_else(|| non_empty_var("SUPABASE_KEY"));
        if service_role_key.is_none() && anon_key.is_none() {
            return Err(RagError::Config(
                "missing store credentials; set SUPABASE_SERVICE_ROLE_KEY (for writes) \
                 or SUPABASE_ANON_KEY"
                    .to_string(),
            ));
        }

        let table = non_empty_var("RAG_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let api_base =
            non_empty_var("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string());
        let api_base = Url::parse(&api_base)
            .map_err(|err| RagError::Config(format!("invalid OPENAI_API_BASE: {err}")))?;
        let model = non_empty_var("EMBED_MODEL").unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string());

        Ok(Self {
            store: StoreConfig {
                url: store_url,
                service_role_key,
                anon_key,
                table,
            },
            embedder: EmbedderConfig {
                api_base,
                api_key,
                model,
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
