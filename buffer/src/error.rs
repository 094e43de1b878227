//! Error types for buffer operations.

use thiserror::Error;

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Errors that can occur when editing a buffer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// Delete range runs backwards.
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange { start: usize, end: usize },
}
