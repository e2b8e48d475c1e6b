//! Error types for the `traverse-world` crate.
//!
//! Only the terrain cache touches the filesystem; the knowledge base,
//! pathfinder, and route planner are infallible (a missing path is an
//! `Option`, not an error).

use std::path::PathBuf;

/// Errors that can occur while reading or writing terrain snapshots.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The cache file could not be read or written.
    #[error("terrain cache I/O on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A cache entry is not a non-negative integer.
    #[error("terrain cache {path} row {row} column {column}: invalid difficulty {value:?}")]
    Parse {
        /// The file involved.
        path: PathBuf,
        /// Zero-based row (`y`).
        row: usize,
        /// Zero-based column (`x`).
        column: usize,
        /// The offending text.
        value: String,
    },

    /// The cache grid is larger than the coordinate range.
    #[error("terrain cache {path} exceeds the coordinate range")]
    TooLarge {
        /// The file involved.
        path: PathBuf,
    },
}
