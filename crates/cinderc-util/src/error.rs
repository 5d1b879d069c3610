//! Error types for the util crate.

use thiserror::Error;

/// Errors produced by [`crate::SourceMap`] queries.
#[derive(Debug, Error)]
pub enum SourceMapError {
    /// File not found in the source map
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Invalid line number
    #[error("invalid line number: {line} (file has {max_lines} lines)")]
    InvalidLine { line: usize, max_lines: usize },
}
