//! # Embeddings
//!
//! Semantic embedding generation and the health-aware vector store for the
//! Aether retrieval engine.
//!
//! The design assumption is that the embedding provider is the least
//! reliable component in the system: it sits behind the network, behind an
//! egress policy, and behind lazy initialization. Everything in this crate
//! therefore degrades instead of failing. Chunks persist without vectors,
//! searches return empty, and the [`VectorHealth`] state tells the rest of
//! the engine to lean on keyword retrieval until the provider recovers.

pub mod egress;
pub mod error;
pub mod provider;
pub mod similarity;
pub mod single_flight;
pub mod vector_store;

pub use egress::EgressPolicy;
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider};
pub use similarity::cosine_similarity;
pub use single_flight::SharedProvider;
pub use vector_store::{
    ChunkInput, DEFAULT_SEARCH_LIMIT, HealthSubscription, VectorHealth, VectorHit, VectorStore,
};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
