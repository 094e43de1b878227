//! Symbol-aware chunk construction.
//!
//! Chunks follow parsed symbol boundaries when a parser produced any, and
//! fall back to fixed-size overlapping windows otherwise. Offsets are byte
//! offsets into the file content; out-of-range or inverted spans are clamped
//! or dropped rather than rejected.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::records::ChunkRecord;

/// Hard cap on chunk text length, in bytes.
const MAX_CHUNK_BYTES: usize = 2200;

/// Stride of the fallback windows. Smaller than the cap so adjacent
/// windows overlap and no symbol straddles a blind spot.
const FALLBACK_STEP: usize = 1600;

/// A named source span reported by a syntax parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpan {
    /// Symbol name, e.g. a function or type identifier.
    pub name: String,

    /// Start byte offset into the file content.
    pub start_index: usize,

    /// End byte offset (exclusive).
    pub end_index: usize,
}

/// Build one chunk per symbol span, sorted by start offset.
///
/// Spans are clamped to the content bounds and empty spans are dropped.
/// Chunk text is truncated to the per-chunk cap, but the recorded
/// `end_index` keeps the full span so ids stay stable for large symbols.
/// Returns fallback windows when no span survives.
pub fn build_chunks_from_symbols(
    file_id: &str,
    content: &str,
    symbols: &[SymbolSpan],
) -> Vec<ChunkRecord> {
    let now = epoch_millis();
    let mut sorted: Vec<&SymbolSpan> = symbols.iter().collect();
    sorted.sort_by_key(|s| s.start_index);

    let mut out = Vec::new();
    for span in sorted {
        let start = snap_down(content, span.start_index.min(content.len()));
        let end = snap_down(content, span.end_index.min(content.len()));
        if end <= start {
            continue;
        }
        let text_end = snap_down(content, end.min(start + MAX_CHUNK_BYTES));
        out.push(ChunkRecord {
            id: ChunkRecord::make_id(file_id, start, end),
            file_id: file_id.to_string(),
            start_index: start,
            end_index: end,
            text: content[start..text_end].to_string(),
            symbols: vec![span.name.clone()],
            updated_at: now,
        });
    }

    if out.is_empty() {
        return fallback_chunks(file_id, content);
    }
    out
}

/// Fixed-size overlapping windows for content with no parsed symbols.
pub fn fallback_chunks(file_id: &str, content: &str) -> Vec<ChunkRecord> {
    let now = epoch_millis();
    let mut out = Vec::new();
    let mut start = 0;
    while start < content.len() {
        let end = snap_down(content, (start + MAX_CHUNK_BYTES).min(content.len()));
        out.push(ChunkRecord {
            id: ChunkRecord::make_id(file_id, start, end),
            file_id: file_id.to_string(),
            start_index: start,
            end_index: end,
            text: content[start..end].to_string(),
            symbols: Vec::new(),
            updated_at: now,
        });
        start = snap_up(content, start + FALLBACK_STEP);
    }
    out
}

/// Milliseconds since the unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn snap_down(content: &str, mut offset: usize) -> usize {
    while offset > 0 && !content.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn snap_up(content: &str, mut offset: usize) -> usize {
    while offset < content.len() && !content.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn span(name: &str, start: usize, end: usize) -> SymbolSpan {
        SymbolSpan {
            name: name.to_string(),
            start_index: start,
            end_index: end,
        }
    }

    #[test]
    fn chunks_follow_symbol_order_not_input_order() {
        let content = "fn beta() {}\nfn alpha() {}\n";
        let chunks = build_chunks_from_symbols(
            "a.rs",
            content,
            &[span("alpha", 13, 26), span("beta", 0, 12)],
        );

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].symbols, vec!["beta".to_string()]);
        assert_eq!(chunks[0].text, "fn beta() {}");
        assert_eq!(chunks[1].symbols, vec!["alpha".to_string()]);
        assert_eq!(chunks[1].id, "a.rs:13:26");
    }

    #[test]
    fn out_of_range_and_empty_spans_are_dropped_or_clamped() {
        let content = "short";
        let chunks = build_chunks_from_symbols(
            "a.rs",
            content,
            &[span("past_end", 2, 999), span("empty", 3, 3), span("inverted", 4, 1)],
        );

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "ort");
        assert_eq!(chunks[0].end_index, content.len());
    }

    #[test]
    fn oversized_symbol_text_is_capped_but_span_is_kept() {
        let content = "x".repeat(5000);
        let chunks = build_chunks_from_symbols("a.rs", &content, &[span("big", 0, 5000)]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.len(), 2200);
        assert_eq!(chunks[0].end_index, 5000);
        assert_eq!(chunks[0].id, "a.rs:0:5000");
    }

    #[test]
    fn no_symbols_falls_back_to_overlapping_windows() {
        let content = "y".repeat(4000);
        let chunks = build_chunks_from_symbols("a.rs", &content, &[]);

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start_index, chunks[0].end_index), (0, 2200));
        assert_eq!((chunks[1].start_index, chunks[1].end_index), (1600, 3800));
        assert_eq!((chunks[2].start_index, chunks[2].end_index), (3200, 4000));
    }

    #[test]
    fn fallback_on_empty_content_yields_nothing() {
        assert!(fallback_chunks("a.rs", "").is_empty());
    }
}
