//! Error types for JSONL persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or appending JSONL files.
///
/// Every variant is treated as unrecoverable by the fetch workflow: a store
/// that cannot be written breaks the resumability guarantee.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system error (open, write, flush, sync).
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not valid JSON.
    #[error("malformed JSON on line {line} of {path}: {source}")]
    MalformedLine {
        /// The JSONL file path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize record for {path}: {source}")]
    Serialize {
        /// The JSONL file path.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-line error.
    pub fn malformed_line(path: impl Into<PathBuf>, line: usize, source: serde_json::Error) -> Self {
        Self::MalformedLine {
            path: path.into(),
            line,
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left");
        let error = StoreError::io("/data/data.jsonl", io_error);
        let msg = error.to_string();
        assert!(msg.contains("/data/data.jsonl"), "Expected path in: {msg}");
        assert!(msg.contains("no space left"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_store_error_malformed_line_display() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = StoreError::malformed_line("/data/data.jsonl", 7, parse_error);
        let msg = error.to_string();
        assert!(msg.contains("line 7"), "Expected line number in: {msg}");
    }
}
