//! Error taxonomy for Lore Keeper.
//!
//! Not-found is deliberately *not* an error: store lookups return
//! `Option`/`bool` and the HTTP layer maps the negative result to 404.
//! Everything else that can fail is covered here.

use thiserror::Error;

/// Failures talking to the embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status. Callers must treat
    /// this as a hard failure, never substitute a zero vector.
    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding response missing vector")]
    MalformedResponse,

    #[error("embedding provider is disabled")]
    Disabled,
}

/// Errors surfaced by the sync layer and the access surfaces above it.
#[derive(Debug, Error)]
pub enum LoreError {
    /// Missing or empty required fields on creation.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// The entry write succeeded but the index write did not. The entry id
    /// is carried so an operator can retry indexing later; the record is
    /// never rolled back over an unavailable embedding backend.
    #[error("entry {entry_id} was stored but its vector could not be indexed")]
    IndexSync {
        entry_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LoreError>;
