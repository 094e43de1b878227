//! # Piece-Table Buffer
//!
//! This crate implements the versioned text buffer backing the Aether editor.
//!
//! A [`PieceTableBuffer`] never mutates in place: `insert` and `delete`
//! return a new buffer version, and old versions stay valid for as long as a
//! caller holds them. Both backing strings are reference-counted, so
//! producing a successor shares the original and added text instead of
//! copying the whole document per edit.

pub mod error;
pub mod piece_table;

pub use error::{BufferError, Result};
pub use piece_table::{CompactionPolicy, Piece, PieceSource, PieceTableBuffer};
