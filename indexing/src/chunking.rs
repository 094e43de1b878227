//! File chunking for lexical indexing.
//!
//! Chunks are line windows over a file. The chunk id is deterministic from
//! the file id and line range, so re-indexing the same content upserts the
//! same ids instead of accumulating duplicates.

use serde::{Deserialize, Serialize};

/// A lexical chunk: a window of lines from one file.
///
/// Lines are 1-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Deterministic id: `"{file_id}:{start_line}-{end_line}"`.
    pub id: String,

    /// File the chunk came from.
    pub file_id: String,

    /// First line of the window (1-based).
    pub start_line: usize,

    /// Last line of the window (inclusive).
    pub end_line: usize,

    /// The chunk text.
    pub text: String,
}

impl IndexedDocument {
    fn new(file_id: &str, start_line: usize, end_line: usize, text: String) -> Self {
        Self {
            id: format!("{file_id}:{start_line}-{end_line}"),
            file_id: file_id.to_string(),
            start_line,
            end_line,
            text,
        }
    }
}

/// Split a file into fixed-size line windows.
pub fn chunk_by_lines(
    file_id: &str,
    content: &str,
    max_lines_per_chunk: usize,
) -> Vec<IndexedDocument> {
    let max_lines = max_lines_per_chunk.max(1);
    let lines: Vec<&str> = content.split('\n').collect();
    let mut docs = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let end = (start + max_lines).min(lines.len());
        docs.push(IndexedDocument::new(
            file_id,
            start + 1,
            end,
            lines[start..end].join("\n"),
        ));
        start = end;
    }
    docs
}

/// Estimate the token count of a span, tiktoken-style (~4 chars per token).
fn estimated_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Split a file into chunks bounded by an approximate token budget.
///
/// Lines accumulate into the current chunk until the next line would push
/// the estimate past the budget; a single oversized line still forms its own
/// chunk rather than being dropped.
pub fn chunk_by_token_budget(
    file_id: &str,
    content: &str,
    max_tokens_per_chunk: usize,
) -> Vec<IndexedDocument> {
    let budget = max_tokens_per_chunk.max(1);
    let lines: Vec<&str> = content.split('\n').collect();
    let mut docs = Vec::new();

    let mut start = 0;
    let mut window_tokens = 0;
    for (i, line) in lines.iter().enumerate() {
        let line_tokens = estimated_tokens(line);
        if i > start && window_tokens + line_tokens > budget {
            docs.push(IndexedDocument::new(
                file_id,
                start + 1,
                i,
                lines[start..i].join("\n"),
            ));
            start = i;
            window_tokens = 0;
        }
        window_tokens += line_tokens;
    }
    docs.push(IndexedDocument::new(
        file_id,
        start + 1,
        lines.len(),
        lines[start..].join("\n"),
    ));
    docs
}
