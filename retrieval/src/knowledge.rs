//! Symbol-aware knowledge index.
//!
//! The second retrieval surface next to the hybrid query: files are chunked
//! along parsed symbol boundaries (with a fixed-size fallback) into durable
//! [`ChunkRecord`]s, and queries rank those chunks by length-normalized
//! keyword frequency. No embeddings are involved, so this path keeps
//! working when the vector store is degraded.

use std::cmp::Reverse;
use std::sync::Arc;

use aether_indexing::{score_text, tokenize};
use aether_store::{ChunkRecord, ChunkStore, SymbolSpan, build_chunks_from_symbols};
use async_trait::async_trait;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::error::Result;

/// Default number of hits returned by [`KnowledgeIndex::query`].
pub const DEFAULT_KNOWLEDGE_TOP_K: usize = 20;

/// External syntax parsing collaborator.
///
/// `None` covers both "no parser for this language" and "parsing failed";
/// either way the caller falls back to fixed-size chunking.
#[async_trait]
pub trait SyntaxParser: Send + Sync {
    async fn parse(&self, language_id: &str, content: &str) -> Option<Vec<SymbolSpan>>;
}

/// A scored knowledge chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeHit {
    pub chunk: ChunkRecord,
    pub score: f32,
}

/// Symbol-aware chunk index over the durable store.
pub struct KnowledgeIndex {
    store: Arc<dyn ChunkStore>,
    parser: Option<Arc<dyn SyntaxParser>>,
}

impl KnowledgeIndex {
    /// Create an index without a parser; every file gets fallback chunks.
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            store,
            parser: None,
        }
    }

    /// Attach a syntax parser for symbol-aligned chunk boundaries.
    pub fn with_parser(mut self, parser: Arc<dyn SyntaxParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Chunk a file and upsert its chunks, returning the chunk count.
    pub async fn ingest_file(
        &self,
        file_id: &str,
        language_id: &str,
        content: &str,
    ) -> Result<usize> {
        let symbols = match &self.parser {
            Some(parser) => parser
                .parse(language_id, content)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let chunks = build_chunks_from_symbols(file_id, content, &symbols);
        let count = chunks.len();
        debug!(file_id, chunks = count, symbols = symbols.len(), "ingested file");
        self.store.upsert_chunks(chunks).await?;
        Ok(count)
    }

    /// Rank all stored chunks against a query.
    ///
    /// Only strictly positive scores are returned, sorted descending and
    /// truncated to `top_k`.
    pub async fn query(&self, query: &str, top_k: Option<usize>) -> Result<Vec<KnowledgeHit>> {
        let top_k = top_k.unwrap_or(DEFAULT_KNOWLEDGE_TOP_K);
        let q_tokens = tokenize(query);
        if q_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let all = self.store.get_all_chunks().await?;
        let mut hits: Vec<KnowledgeHit> = all
            .into_iter()
            .filter_map(|chunk| {
                let score = score_text(&q_tokens, &chunk.text);
                (score > 0.0).then_some(KnowledgeHit { chunk, score })
            })
            .collect();

        hits.sort_by_key(|hit| Reverse(OrderedFloat(hit.score)));
        hits.truncate(top_k);
        Ok(hits)
    }
}
