//! Foundation types for the engine.
//!
//! - [`Name`], [`Interner`] - identifier interning
//! - [`FileId`], [`FilePosition`], [`FileRange`] - program points and extents
//! - [`LineCol`], [`LineIndex`] - line/column conversion for diagnostics
//!
//! This module has NO dependencies on other modules of the crate.

mod intern;
mod span;

pub use intern::{Interner, Name};
pub use span::{FileId, FilePosition, FileRange, LineCol, LineIndex, TextRange, TextSize};

pub use text_size;
