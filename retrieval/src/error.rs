//! Error types for the retrieval coordinator.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval coordinator.
///
/// Worker-boundary failures are not composed here: the bridge reports
/// [`WorkerError`] directly so callers can match on timeout vs crash.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] aether_embeddings::EmbeddingError),

    /// Chunk store error.
    #[error("store error: {0}")]
    Store(#[from] aether_store::StoreError),
}

/// Errors crossing the task/worker boundary.
///
/// `Timeout` is deliberately distinct from the other variants so callers
/// can show "still working" rather than "failed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker did not reply within the request deadline.
    #[error("worker request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The worker task stopped before replying.
    #[error("worker crashed")]
    Crashed,

    /// The worker replied with an error payload.
    #[error("worker error: {0}")]
    Worker(String),
}
