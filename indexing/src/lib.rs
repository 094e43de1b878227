//! # Lexical Indexing
//!
//! This crate provides the lexical half of the Aether retrieval engine:
//!
//! - **Tokenization**: lowercase alphanumeric/underscore tokens
//! - **Chunking**: fixed line windows or a token budget per chunk
//! - **TF-IDF Index**: ranked keyword search with substring query expansion
//!   and exact/whole-word post-filtering
//!
//! Rebuilding the index is a full pass over the corpus; callers rebuild on
//! explicit re-index requests, not on every keystroke.

pub mod chunking;
pub mod tfidf;
pub mod tokenize;

pub use chunking::{IndexedDocument, chunk_by_lines, chunk_by_token_budget};
pub use tfidf::{SearchHit, SearchOptions, SourceFile, TfIdfIndex};
pub use tokenize::{score_text, term_frequency, tokenize};

/// Default number of lines per chunk.
pub const DEFAULT_LINES_PER_CHUNK: usize = 50;

/// Default token budget per chunk.
pub const DEFAULT_TOKENS_PER_CHUNK: usize = 500;

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 8;
