//! The attempted-set checkpoint.
//!
//! Every identifier is recorded here before its lookup is issued, so an
//! interrupted run never re-attempts it. The file is an append log of
//! `{"row": "<id>"}` lines; it is read once into memory and then appended
//! incrementally.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::StoreError;
use super::jsonl::JsonlWriter;

/// One line of the attempted-set file.
#[derive(Debug, Serialize)]
struct AttemptedRow<'a> {
    row: &'a str,
}

/// In-memory view of the attempted identifiers, persisted incrementally.
#[derive(Debug)]
pub struct AttemptedSet {
    path: PathBuf,
    ids: HashSet<String>,
    writer: Option<JsonlWriter>,
}

impl AttemptedSet {
    /// Loads the attempted identifiers from `path`.
    ///
    /// A missing file yields an empty set. Lines that are not JSON or lack a
    /// string `row` are ignored with a warning; a crash mid-append leaves
    /// such a torn final line behind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => String::new(),
            Err(error) => return Err(StoreError::io(path, error)),
        };

        let mut ids = HashSet::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|value| value.get("row").and_then(Value::as_str).map(str::to_string));
            match row {
                Some(id) => {
                    ids.insert(id);
                }
                None => warn!(
                    path = %path.display(),
                    line = index + 1,
                    "ignoring attempted-set line without a row id"
                ),
            }
        }
        debug!(path = %path.display(), count = ids.len(), "loaded attempted set");

        Ok(Self {
            path: path.to_path_buf(),
            ids,
            writer: None,
        })
    }

    /// Returns true when `id` was already attempted.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records `id` as attempted and syncs it to disk.
    ///
    /// Returns `false` without writing if `id` is already present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the append or sync fails. The id is only
    /// added to the in-memory set once it is durable.
    pub fn record(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.ids.contains(id) {
            return Ok(false);
        }
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => JsonlWriter::append(&self.path)?,
        };
        let writer = self.writer.insert(writer);
        writer.write_record(&AttemptedRow { row: id })?;
        writer.sync()?;
        self.ids.insert(id.to_string());
        Ok(true)
    }

    /// Number of attempted identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true when nothing has been attempted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
