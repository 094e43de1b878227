//! Piece-table implementation.
//!
//! The buffer is a sequence of [`Piece`]s referencing two immutable backing
//! strings: the `original` text the buffer was created from, and an
//! append-only `added` string holding every inserted character. Concatenating
//! the referenced spans in order reproduces the current text exactly; that
//! reproduction invariant is what every mutation must preserve.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BufferError, Result};

/// Which backing string a piece references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceSource {
    /// The text the buffer was created from.
    Original,
    /// The append-only string of inserted text.
    Added,
}

/// A contiguous span into one of the two backing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Backing string this piece references.
    pub source: PieceSource,

    /// Byte offset into the backing string.
    pub start: usize,

    /// Length of the span in bytes.
    pub length: usize,
}

/// When to replace a fragmented buffer with a single-piece rebuild.
///
/// Compaction is an optimization, not a correctness requirement: the rebuilt
/// buffer holds the same text in a cheaper representation.
#[derive(Debug, Clone, Copy)]
pub struct CompactionPolicy {
    /// Compact when the piece count reaches this threshold. Normalization
    /// already merges adjacent same-source pieces, so the count only grows
    /// when edits create non-adjacent fragments; a threshold on it measures
    /// fragmentation directly.
    pub max_pieces: usize,

    /// Compact when the added string grows past this multiple of the live
    /// text length, meaning mostly dead/overwritten text is being retained.
    pub added_waste_ratio: usize,

    /// Log a warning when the rebuild itself takes longer than this many
    /// milliseconds. Diagnostic only.
    pub warn_latency_ms: u128,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            max_pieces: 200,
            added_waste_ratio: 3,
            warn_latency_ms: 4,
        }
    }
}

/// An immutable, versioned piece-table text buffer.
///
/// Every `insert`/`delete` produces a successor buffer; the caller keeps
/// whichever versions it needs and simply drops the rest. Offsets are byte
/// offsets; an offset falling inside a multi-byte character is snapped down
/// to the previous character boundary rather than panicking.
#[derive(Debug, Clone)]
pub struct PieceTableBuffer {
    original: Arc<str>,
    added: Arc<str>,
    pieces: Vec<Piece>,
    length: usize,
    policy: CompactionPolicy,
}

impl PieceTableBuffer {
    /// Create a buffer from initial text.
    pub fn from_text(text: &str) -> Self {
        Self::with_policy(text, CompactionPolicy::default())
    }

    /// Create a buffer with a custom compaction policy.
    pub fn with_policy(text: &str, policy: CompactionPolicy) -> Self {
        let pieces = vec![Piece {
            source: PieceSource::Original,
            start: 0,
            length: text.len(),
        }];
        Self::assemble(Arc::from(text), Arc::from(""), pieces, policy)
    }

    fn assemble(
        original: Arc<str>,
        added: Arc<str>,
        pieces: Vec<Piece>,
        policy: CompactionPolicy,
    ) -> Self {
        let pieces = normalize(pieces);
        let length = pieces.iter().map(|p| p.length).sum();
        Self {
            original,
            added,
            pieces,
            length,
            policy,
        }
    }

    /// Current text length in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of pieces in the table (fragmentation diagnostic).
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Size of the append-only added string (waste diagnostic).
    pub fn added_len(&self) -> usize {
        self.added.len()
    }

    fn backing(&self, source: PieceSource) -> &str {
        match source {
            PieceSource::Original => &self.original,
            PieceSource::Added => &self.added,
        }
    }

    /// Reproduce the current text by concatenating the referenced spans.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.length);
        for p in &self.pieces {
            let src = self.backing(p.source);
            out.push_str(&src[p.start..p.start + p.length]);
        }
        out
    }

    /// Insert text at `offset`, returning the successor buffer.
    ///
    /// The offset is clamped into `[0, len]`. The inserted text is appended
    /// to the added string exactly once; it is never overwritten by later
    /// edits.
    pub fn insert(&self, offset: usize, text: &str) -> Self {
        if text.is_empty() {
            return self.clone();
        }
        let offset = offset.min(self.length);

        let add_start = self.added.len();
        let mut next_added = String::with_capacity(add_start + text.len());
        next_added.push_str(&self.added);
        next_added.push_str(text);

        let insert_piece = Piece {
            source: PieceSource::Added,
            start: add_start,
            length: text.len(),
        };

        let (split, offset) = self.split_at(&self.pieces, offset);
        let mut out = Vec::with_capacity(split.len() + 1);
        let mut cursor = 0;
        let mut inserted = false;
        for p in split {
            if !inserted && cursor == offset {
                out.push(insert_piece);
                inserted = true;
            }
            cursor += p.length;
            out.push(p);
        }
        if !inserted {
            out.push(insert_piece);
        }

        Self::assemble(
            Arc::clone(&self.original),
            Arc::from(next_added.as_str()),
            out,
            self.policy,
        )
        .maybe_compact()
    }

    /// Delete the byte range `[start, end_exclusive)`, returning the
    /// successor buffer.
    ///
    /// Both offsets are clamped into `[0, len]`; a range that runs backwards
    /// fails with [`BufferError::InvalidRange`].
    pub fn delete(&self, start: usize, end_exclusive: usize) -> Result<Self> {
        let clamped_start = start.min(self.length);
        let clamped_end = end_exclusive.min(self.length);
        if clamped_end < clamped_start {
            return Err(BufferError::InvalidRange { start, end: end_exclusive });
        }
        if clamped_start == clamped_end {
            return Ok(self.clone());
        }

        let (split, start) = self.split_at(&self.pieces, clamped_start);
        let (split, end) = self.split_at(&split, clamped_end);

        let mut out = Vec::with_capacity(split.len());
        let mut cursor = 0;
        for p in split {
            let next_cursor = cursor + p.length;
            let overlaps = next_cursor > start && cursor < end;
            if !overlaps {
                out.push(p);
            }
            cursor = next_cursor;
        }

        Ok(Self::assemble(
            Arc::clone(&self.original),
            Arc::clone(&self.added),
            out,
            self.policy,
        )
        .maybe_compact())
    }

    /// Split any piece straddling `offset` into two.
    ///
    /// Returns the new piece list and the (possibly snapped-down) offset the
    /// split actually landed on.
    fn split_at(&self, pieces: &[Piece], offset: usize) -> (Vec<Piece>, usize) {
        let mut out = Vec::with_capacity(pieces.len() + 1);
        let mut cursor = 0;
        let mut landed = offset;
        for p in pieces {
            let next_cursor = cursor + p.length;
            if offset <= cursor || offset >= next_cursor {
                if p.length > 0 {
                    out.push(*p);
                }
            } else {
                let src = self.backing(p.source);
                let mut left_len = offset - cursor;
                while !src.is_char_boundary(p.start + left_len) {
                    left_len -= 1;
                }
                landed = cursor + left_len;
                if left_len > 0 {
                    out.push(Piece {
                        source: p.source,
                        start: p.start,
                        length: left_len,
                    });
                }
                if p.length > left_len {
                    out.push(Piece {
                        source: p.source,
                        start: p.start + left_len,
                        length: p.length - left_len,
                    });
                }
            }
            cursor = next_cursor;
        }
        (out, landed)
    }

    fn needs_compaction(&self) -> bool {
        if self.pieces.len() >= self.policy.max_pieces {
            return true;
        }
        !self.added.is_empty()
            && self.length > 0
            && self.added.len() > self.length * self.policy.added_waste_ratio
    }

    fn maybe_compact(self) -> Self {
        if !self.needs_compaction() {
            return self;
        }
        let started = Instant::now();
        let text = self.text();
        let compacted = Self::with_policy(&text, self.policy);
        let elapsed = started.elapsed().as_millis();
        if elapsed > self.policy.warn_latency_ms {
            warn!(
                pieces = self.pieces.len(),
                length = self.length,
                elapsed_ms = elapsed,
                "piece table compaction was slow"
            );
        }
        compacted
    }
}

/// Drop zero-length pieces and merge adjacent same-source contiguous pieces.
fn normalize(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut out: Vec<Piece> = Vec::with_capacity(pieces.len());
    for p in pieces {
        if p.length == 0 {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.source == p.source && last.start + last.length == p.start {
                last.length += p.length;
                continue;
            }
        }
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_adds_text_and_keeps_old_version() {
        let b = PieceTableBuffer::from_text("abc");
        let b2 = b.insert(1, "ZZ");
        assert_eq!(b.text(), "abc");
        assert_eq!(b2.text(), "aZZbc");
    }

    #[test]
    fn delete_removes_range() {
        let b = PieceTableBuffer::from_text("hello world");
        let b2 = b.delete(5, 11).unwrap();
        assert_eq!(b2.text(), "hello");
    }

    #[test]
    fn delete_clamps_past_end() {
        let b = PieceTableBuffer::from_text("hello");
        let b2 = b.delete(3, 100).unwrap();
        assert_eq!(b2.text(), "hel");
    }

    #[test]
    fn insert_then_delete_stays_consistent() {
        let b = PieceTableBuffer::from_text("012345");
        let b2 = b.insert(3, "AAA").delete(2, 6).unwrap();
        assert_eq!(b2.text(), "01345");
    }

    #[test]
    fn deleting_inserted_text_restores_original() {
        let b = PieceTableBuffer::from_text("abc");
        let b2 = b.insert(1, "ZZ");
        assert_eq!(b2.text(), "aZZbc");
        let b3 = b2.delete(1, 3).unwrap();
        assert_eq!(b3.text(), "abc");
    }

    #[test]
    fn backwards_range_is_rejected() {
        let b = PieceTableBuffer::from_text("abcdef");
        let err = b.delete(4, 2).unwrap_err();
        assert_eq!(err, BufferError::InvalidRange { start: 4, end: 2 });
    }

    #[test]
    fn insert_offset_is_clamped() {
        let b = PieceTableBuffer::from_text("abc");
        assert_eq!(b.insert(999, "!").text(), "abc!");
    }

    #[test]
    fn empty_insert_is_a_no_op() {
        let b = PieceTableBuffer::from_text("abc");
        let b2 = b.insert(1, "");
        assert_eq!(b2.text(), "abc");
        assert_eq!(b2.piece_count(), 1);
    }

    #[test]
    fn zero_width_delete_is_a_no_op() {
        let b = PieceTableBuffer::from_text("abc");
        assert_eq!(b.delete(2, 2).unwrap().text(), "abc");
    }

    #[test]
    fn multibyte_offsets_snap_to_char_boundaries() {
        // 'é' is two bytes; offset 2 falls inside it and must snap down.
        let b = PieceTableBuffer::from_text("héllo");
        let b2 = b.insert(2, "X");
        assert_eq!(b2.text(), "hXéllo");
        // A range end inside the codepoint snaps down too, leaving it intact.
        let b3 = b.delete(1, 2).unwrap();
        assert_eq!(b3.text(), "héllo");
        let b4 = b.delete(1, 3).unwrap();
        assert_eq!(b4.text(), "hllo");
    }

    /// Replay a mixed edit sequence against a naive mutable string and check
    /// the piece table reproduces it byte for byte at every step.
    #[test]
    fn replay_matches_naive_string_model() {
        enum Op {
            Insert(usize, &'static str),
            Delete(usize, usize),
        }
        let script = [
            Op::Insert(0, "hello "),
            Op::Insert(6, "brave "),
            Op::Insert(12, "world"),
            Op::Delete(0, 6),
            Op::Insert(5, ","),
            Op::Insert(100, "!"),
            Op::Delete(3, 3),
            Op::Insert(0, ">> "),
            Op::Delete(0, 3),
            Op::Delete(2, 50),
        ];

        let mut model = String::from("seed text");
        let mut buf = PieceTableBuffer::from_text(&model);
        for op in &script {
            match *op {
                Op::Insert(offset, text) => {
                    let at = offset.min(model.len());
                    model.insert_str(at, text);
                    buf = buf.insert(offset, text);
                }
                Op::Delete(start, end) => {
                    let s = start.min(model.len());
                    let e = end.min(model.len());
                    model.replace_range(s..e, "");
                    buf = buf.delete(start, end).unwrap();
                }
            }
            assert_eq!(buf.text(), model);
            assert_eq!(buf.len(), model.len());
        }
    }

    /// Deterministic fuzz: a xorshift stream of inserts/deletes replayed
    /// against the naive model.
    #[test]
    fn fuzz_replay_matches_naive_string_model() {
        let mut state: u64 = 0x5eed_cafe;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut model = String::from("the quick brown fox jumps over the lazy dog");
        let mut buf = PieceTableBuffer::from_text(&model);
        let alphabet = ["a", "Bc", "def", "_", "0123"];

        for _ in 0..500 {
            let roll = next();
            if roll % 3 == 0 && !model.is_empty() {
                let start = (next() as usize) % (model.len() + 1);
                let end = start + (next() as usize) % 8;
                let s = start.min(model.len());
                let e = end.min(model.len());
                model.replace_range(s..e, "");
                buf = buf.delete(start, end).unwrap();
            } else {
                let offset = (next() as usize) % (model.len() + 1);
                let text = alphabet[(next() as usize) % alphabet.len()];
                model.insert_str(offset, text);
                buf = buf.insert(offset, text);
            }
            assert_eq!(buf.text(), model);
        }
    }

    #[test]
    fn compaction_is_transparent() {
        let mut model = String::from("xy");
        let mut buf = PieceTableBuffer::from_text(&model);
        // Repeated front inserts create non-adjacent added pieces, so the
        // table fragments until the piece-count threshold trips.
        for i in 0..250 {
            let text = if i % 2 == 0 { "a" } else { "b" };
            model.insert_str(0, text);
            buf = buf.insert(0, text);
        }
        assert_eq!(buf.text(), model);
        assert!(buf.piece_count() < 100, "expected a compaction rebuild");
    }

    #[test]
    fn compaction_honors_custom_policy() {
        let policy = CompactionPolicy {
            max_pieces: 8,
            ..Default::default()
        };
        let mut buf = PieceTableBuffer::with_policy("0123456789", policy);
        for _ in 0..50 {
            buf = buf.insert(0, "z");
        }
        assert!(buf.piece_count() <= 8);
        assert_eq!(buf.len(), 60);
    }

    #[test]
    fn added_waste_triggers_compaction() {
        let policy = CompactionPolicy::default();
        let mut buf = PieceTableBuffer::with_policy("ab", policy);
        // Insert a large run, then delete most of it: the added string now
        // retains far more bytes than the live text.
        let big = "x".repeat(64);
        buf = buf.insert(1, &big);
        let buf = buf.delete(1, 63).unwrap();
        assert_eq!(buf.text(), "axxb");
        assert!(buf.added_len() <= buf.len() * policy.added_waste_ratio);
    }
}
