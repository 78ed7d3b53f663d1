//! Error types for the merge workflow.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while merging parsed text into metadata.
///
/// Unmatched identifiers and unusable parsed files are not errors; they are
/// logged and counted.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Reading the metadata JSONL or writing the merged output failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A parsed-PDF file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The parsed-PDF directory cannot be turned into a search pattern.
    #[error("cannot search {path}: {reason}")]
    InvalidDir {
        /// The directory that was given.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },
}

impl MergeError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-directory error.
    pub fn invalid_dir(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDir {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
