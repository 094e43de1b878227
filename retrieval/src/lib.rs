//! # Retrieval Coordinator
//!
//! The orchestration layer of the Aether retrieval engine. It binds the
//! lexical index, the vector store, and the knowledge index together:
//!
//! - **Hybrid query**: semantic and keyword branches run concurrently under
//!   independent timeouts and merge into one ranked list
//! - **Knowledge index**: symbol-aware chunks ranked by keyword density
//! - **Worker boundary**: index builds, searches, and parses run on a
//!   dedicated task behind tagged request/reply messages
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   HybridRetrieval                        │
//! ├──────────────────────────────────────────────────────────┤
//! │   vector branch (timeout)      keyword branch (timeout)  │
//! │        │                              │                  │
//! │        ▼                              ▼                  │
//! │   VectorStore ──────┐          ChunkStore records        │
//! │                     └── merge (boost + fill + dedup)     │
//! └──────────────────────────────────────────────────────────┘
//!
//!      WorkerBridge ──► worker task (TfIdfIndex, parser)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aether_retrieval::HybridRetrieval;
//!
//! let engine = HybridRetrieval::new(vector_store, chunk_store);
//! engine.index_file("src/main.rs", &content).await?;
//! let hits = engine.query("where is the cache invalidated", None).await;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod worker;

pub use config::RetrievalConfig;
pub use engine::{HybridRetrieval, QueryHit};
pub use error::{Result, RetrievalError, WorkerError};
pub use knowledge::{DEFAULT_KNOWLEDGE_TOP_K, KnowledgeHit, KnowledgeIndex, SyntaxParser};
pub use worker::{IndexSearchResult, WorkerBridge, WorkerReply, WorkerRequest};

// Re-export from dependencies for convenience
pub use aether_embeddings::{VectorHealth, VectorStore};
pub use aether_indexing::{SearchOptions, SourceFile, TfIdfIndex};
pub use aether_store::{ChunkStore, JsonFileStore, MemoryStore};
