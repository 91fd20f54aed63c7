//! Shared error type for the ragpipe crate.

use thiserror::Error;

/// Errors surfaced by the chunking, embedding, storage, and ingestion layers.
///
/// Failure handling follows a simple taxonomy: configuration problems and
/// rejected writes are fatal to the call that hit them, while per-row and
/// per-candidate failures inside similarity search are absorbed internally
/// (search degrades to an empty result instead of erroring).
#[derive(Debug, Error)]
pub enum RagError {
    /// Required configuration (credential, URL, model name) is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The store rejected a write because the credential lacks write privilege.
    #[error(
        "store rejected the write ({reason}); writes require a service-role key, \
         set SUPABASE_SERVICE_ROLE_KEY in the environment"
    )]
    WriteAuthorization { reason: String },

    /// A persistence operation failed for a reason other than authorization.
    #[error("storage error: {0}")]
    Storage(String),

    /// The embedding provider returned an error or a malformed response.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A source document could not be parsed.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Filesystem error while reading ingestion inputs.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
