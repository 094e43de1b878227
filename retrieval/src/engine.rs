//! Hybrid retrieval coordinator.
//!
//! Runs the semantic (vector) and lexical (keyword) branches concurrently,
//! each under its own timeout, then merges the two ranked lists. A branch
//! that fails or times out contributes nothing; the query itself never
//! fails. Merging is semantic-first by design: vector scores are boosted by
//! a fixed multiplier and keyword hits fill the remaining slots.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use aether_embeddings::VectorStore;
use aether_indexing::{DEFAULT_LINES_PER_CHUNK, chunk_by_lines, score_text, tokenize};
use aether_store::{ChunkStore, VectorRecord};
use ordered_float::OrderedFloat;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::error::Result;

/// Maximum snippet length in bytes.
const SNIPPET_MAX_BYTES: usize = 200;

/// One merged hybrid query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// Chunk identity, used for deduplication across branches.
    pub id: String,
    pub file_id: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Combined score: boosted cosine similarity for semantic hits,
    /// normalized keyword frequency for lexical fill.
    pub score: f32,
    /// Leading slice of the chunk text.
    pub snippet: String,
}

/// Coordinates the semantic and lexical retrieval branches.
pub struct HybridRetrieval {
    vector: Arc<VectorStore>,
    store: Arc<dyn ChunkStore>,
    config: RetrievalConfig,
}

impl HybridRetrieval {
    /// Create a coordinator with the default configuration.
    pub fn new(vector: Arc<VectorStore>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            vector,
            store,
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Chunk a file by line windows and persist its vectors.
    ///
    /// Returns the number of chunks. Embedding failures degrade the vector
    /// store instead of failing the call; store failures propagate.
    pub async fn index_file(&self, file_id: &str, content: &str) -> Result<usize> {
        let chunks: Vec<aether_embeddings::ChunkInput> =
            chunk_by_lines(file_id, content, DEFAULT_LINES_PER_CHUNK)
                .into_iter()
                .map(|doc| aether_embeddings::ChunkInput {
                    content: doc.text,
                    start_line: doc.start_line,
                    end_line: doc.end_line,
                })
                .collect();
        let count = chunks.len();
        self.vector.persist_vectors(file_id, &chunks).await?;
        Ok(count)
    }

    /// Run the hybrid query.
    ///
    /// Both branches run concurrently under independent timeouts. The
    /// merged list is sorted descending by combined score and truncated to
    /// `top_k` (default from the configuration).
    pub async fn query(&self, text: &str, top_k: Option<usize>) -> Vec<QueryHit> {
        let top_k = top_k.unwrap_or(self.config.top_k);

        let (vector_branch, keyword_branch) = tokio::join!(
            timeout(
                self.config.vector_timeout,
                self.vector.search(text, Some(top_k))
            ),
            timeout(self.config.keyword_timeout, self.keyword_search(text, top_k)),
        );

        let vector_hits = match vector_branch {
            Ok(hits) => hits,
            Err(_) => {
                warn!("vector branch timed out, degrading to keyword-only");
                Vec::new()
            }
        };
        let keyword_hits = match keyword_branch {
            Ok(hits) => hits,
            Err(_) => {
                warn!("keyword branch timed out");
                Vec::new()
            }
        };

        debug!(
            semantic = vector_hits.len(),
            keyword = keyword_hits.len(),
            "merging hybrid branches"
        );

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<QueryHit> = Vec::new();

        for hit in vector_hits {
            if merged.len() >= top_k {
                break;
            }
            if seen.insert(hit.record.id.clone()) {
                merged.push(to_hit(&hit.record, hit.score * self.config.vector_boost));
            }
        }

        // Keyword hits fill whatever the semantic branch left open.
        for (record, score) in keyword_hits {
            if merged.len() >= top_k {
                break;
            }
            if seen.insert(record.id.clone()) {
                merged.push(to_hit(&record, score));
            }
        }

        merged.sort_by_key(|hit| Reverse(OrderedFloat(hit.score)));
        merged.truncate(top_k);
        merged
    }

    /// Lexical branch: length-normalized keyword frequency over every
    /// stored record, embeddings not required.
    async fn keyword_search(&self, text: &str, top_k: usize) -> Vec<(VectorRecord, f32)> {
        let q_tokens = tokenize(text);
        if q_tokens.is_empty() {
            return Vec::new();
        }
        let all = match self.store.get_all_vectors().await {
            Ok(all) => all,
            Err(e) => {
                warn!("keyword branch failed to read store: {e}");
                return Vec::new();
            }
        };

        let mut hits: Vec<(VectorRecord, f32)> = all
            .into_iter()
            .filter_map(|record| {
                let score = score_text(&q_tokens, &record.content);
                (score > 0.0).then_some((record, score))
            })
            .collect();
        hits.sort_by_key(|(_, score)| Reverse(OrderedFloat(*score)));
        hits.truncate(top_k);
        hits
    }
}

fn to_hit(record: &VectorRecord, score: f32) -> QueryHit {
    QueryHit {
        id: record.id.clone(),
        file_id: record.file_id.clone(),
        start_line: record.start_line,
        end_line: record.end_line,
        score,
        snippet: snippet(&record.content),
    }
}

fn snippet(content: &str) -> String {
    if content.len() <= SNIPPET_MAX_BYTES {
        return content.to_string();
    }
    let mut end = SNIPPET_MAX_BYTES;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_string()
}
