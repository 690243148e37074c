//! Error types for the sheet tree builder and writer.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the filesystem side of the sheet module.
///
/// Grammar mismatches are never errors (malformed paths are skipped
/// during the build); only actual I/O failures reach this type. Nothing
/// is retried: callers decide what a failure means for them.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The recursive walk failed. A partial listing is never returned:
    /// the whole call fails.
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A copy, write, or directory creation failed.
    #[error("filesystem operation failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
