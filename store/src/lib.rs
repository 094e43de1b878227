//! # Chunk/Vector Store
//!
//! This crate defines the durable storage contract shared by both index
//! types of the Aether retrieval engine, plus two implementations:
//!
//! - [`MemoryStore`]: in-process reference implementation
//! - [`JsonFileStore`]: best-effort on-disk cache with atomic writes
//!
//! All writes are upserts keyed by deterministic chunk id, which makes
//! concurrent writers idempotent without explicit locking; a successful
//! upsert is visible to subsequent reads from the same process.

pub mod error;
pub mod json_file;
pub mod memory;
pub mod records;
pub mod symbols;

pub use error::{Result, StoreError};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use records::{ChunkRecord, VectorRecord, content_hash};
pub use symbols::{SymbolSpan, build_chunks_from_symbols, fallback_chunks};

use async_trait::async_trait;

/// Storage contract for lexical/semantic chunks and their vectors.
///
/// The store is the long-lived owner of derived chunks across sessions;
/// in-memory indexes are rebuildable caches on top of it.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// All vector records for one file.
    async fn get_vectors_for_file(&self, file_id: &str) -> Result<Vec<VectorRecord>>;

    /// Insert or replace vector records, keyed by id.
    async fn upsert_vectors(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Every vector record in the store.
    async fn get_all_vectors(&self) -> Result<Vec<VectorRecord>>;

    /// All symbol-aware chunk records for one file.
    async fn get_chunks_for_file(&self, file_id: &str) -> Result<Vec<ChunkRecord>>;

    /// Insert or replace chunk records, keyed by id.
    async fn upsert_chunks(&self, records: Vec<ChunkRecord>) -> Result<()>;

    /// Every chunk record in the store.
    async fn get_all_chunks(&self) -> Result<Vec<ChunkRecord>>;
}
