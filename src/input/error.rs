//! Error types for identifier input files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading the identifier input file.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file could not be opened or read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The input file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid delimited text.
    #[error("malformed input in {path}: {source}")]
    Csv {
        /// The input file path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row.
    #[error("column '{column}' not found in header of {path}\n  Suggestion: {suggestion}")]
    MissingColumn {
        /// The input file path.
        path: PathBuf,
        /// The column that was looked up.
        column: String,
        /// How to fix the issue.
        suggestion: String,
    },
}

impl InputError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV error, unwrapping IO failures into [`InputError::Io`].
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        let path = path.into();
        if source.is_io_error() {
            if let csv::ErrorKind::Io(io) = source.into_kind() {
                return Self::Io { path, source: io };
            }
            return Self::Io {
                path,
                source: std::io::Error::other("unknown csv IO error"),
            };
        }
        Self::Csv { path, source }
    }

    /// Creates a missing-column error.
    pub fn missing_column(path: impl Into<PathBuf>, column: &str) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.to_string(),
            suggestion: "Pass the header name with --doi-column / --id-column".to_string(),
        }
    }
}
