//! Configuration for the retrieval coordinator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the hybrid retrieval coordinator.
///
/// The boost factor and the asymmetric timeouts are tuning constants, not
/// correctness constraints; callers with different latency or relevance
/// trade-offs should override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of merged results per query.
    pub top_k: usize,

    /// Multiplier applied to vector-similarity scores during merging.
    pub vector_boost: f32,

    /// Budget for the semantic branch. Long, because embedding model
    /// load dominates first-query latency.
    pub vector_timeout: Duration,

    /// Budget for the lexical branch.
    pub keyword_timeout: Duration,

    /// Top-level budget for one worker round-trip.
    pub request_timeout: Duration,
}

impl RetrievalConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            top_k: 8,
            vector_boost: 2.0,
            vector_timeout: Duration::from_secs(15),
            keyword_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the merged result limit.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the vector score boost.
    pub fn with_vector_boost(mut self, boost: f32) -> Self {
        self.vector_boost = boost;
        self
    }

    /// Set the semantic branch timeout.
    pub fn with_vector_timeout(mut self, timeout: Duration) -> Self {
        self.vector_timeout = timeout;
        self
    }

    /// Set the lexical branch timeout.
    pub fn with_keyword_timeout(mut self, timeout: Duration) -> Self {
        self.keyword_timeout = timeout;
        self
    }

    /// Set the worker round-trip timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new()
    }
}
