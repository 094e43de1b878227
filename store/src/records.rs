//! Persistent record types.

use serde::{Deserialize, Serialize};

/// A per-chunk embedding record, keyed by file and line range.
///
/// `embedding` is optional: when the provider was unavailable at persist
/// time the record still participates in keyword fallback, it just never
/// enters cosine-similarity ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Deterministic id: `"{file_id}:{start_line}-{end_line}"`.
    pub id: String,

    /// File the chunk came from.
    pub file_id: String,

    /// The chunk text.
    pub content: String,

    /// First line of the chunk (1-based).
    pub start_line: usize,

    /// Last line of the chunk (inclusive).
    pub end_line: usize,

    /// Embedding vector, absent when the provider failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Rolling hash of `content`, used to skip re-embedding unchanged
    /// chunks across re-indexing.
    pub hash: String,

    /// Optional caller-defined tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl VectorRecord {
    /// Deterministic id for a file/line-range chunk.
    pub fn make_id(file_id: &str, start_line: usize, end_line: usize) -> String {
        format!("{file_id}:{start_line}-{end_line}")
    }
}

/// A symbol-aware chunk derived from parsed syntax boundaries.
///
/// Character-offset based, unlike the line-based [`VectorRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic id: `"{file_id}:{start_index}:{end_index}"`.
    pub id: String,

    /// File the chunk came from.
    pub file_id: String,

    /// Start byte offset into the file content.
    pub start_index: usize,

    /// End byte offset (exclusive).
    pub end_index: usize,

    /// The chunk text (possibly truncated, see the chunk builders).
    pub text: String,

    /// Names of the symbols this chunk covers; empty for fallback chunks.
    pub symbols: Vec<String>,

    /// Milliseconds since the unix epoch at ingest time.
    pub updated_at: u64,
}

impl ChunkRecord {
    /// Deterministic id for a file/offset-range chunk.
    pub fn make_id(file_id: &str, start_index: usize, end_index: usize) -> String {
        format!("{file_id}:{start_index}:{end_index}")
    }
}

/// Cheap rolling content hash, rendered base-36.
///
/// This only has to be fast and stable for change detection; it makes no
/// collision-resistance promises.
pub fn content_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for ch in text.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32);
    }
    to_base36(hash)
}

fn to_base36(value: i32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let negative = value < 0;
    let mut magnitude = (value as i64).unsigned_abs();
    let mut out = Vec::new();
    while magnitude > 0 {
        out.push(DIGITS[(magnitude % 36) as usize]);
        magnitude /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
