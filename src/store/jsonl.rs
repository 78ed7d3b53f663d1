//! Newline-delimited JSON files: append-only writer and line reader.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use super::StoreError;

/// Append-only JSONL writer that flushes after every record.
///
/// Each record becomes one compact JSON line. Once [`write_record`](Self::write_record)
/// returns, the line has been handed to the OS; use [`sync`](Self::sync) when
/// it must also survive a power loss.
#[derive(Debug)]
pub struct JsonlWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlWriter {
    /// Opens `path` for appending, creating it and its parent directories.
    ///
    /// If the file ends mid-line (a previous writer died during a write), a
    /// newline is written first so the next record starts on its own line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be created.
    pub fn append(path: &Path) -> Result<Self, StoreError> {
        let mut file = open_with(path, OpenOptions::new().create(true).append(true))?;
        if ends_mid_line(path).map_err(|e| StoreError::io(path, e))? {
            warn!(path = %path.display(), "terminating torn final line");
            file.write_all(b"\n").map_err(|e| StoreError::io(path, e))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Opens `path` for writing from scratch, truncating any existing content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be created.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let file = open_with(
            path,
            OpenOptions::new().create(true).write(true).truncate(true),
        )?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Writes one record as a single line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub fn write_record<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<(), StoreError> {
        let line =
            serde_json::to_string(record).map_err(|e| StoreError::serialize(&self.path, e))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush())
            .map_err(|e| StoreError::io(&self.path, e))?;
        trace!(path = %self.path.display(), bytes = line.len(), "appended JSONL record");
        Ok(())
    }

    /// Forces written records to stable storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the flush or fsync fails.
    pub fn sync(&mut self) -> Result<(), StoreError> {
        self.writer
            .flush()
            .and_then(|()| self.writer.get_ref().sync_data())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ends_mid_line(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn open_with(path: &Path, options: &OpenOptions) -> Result<File, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    options.open(path).map_err(|e| StoreError::io(path, e))
}

/// Reads every JSON value from a JSONL file, in file order.
///
/// Blank lines are ignored.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read and
/// [`StoreError::MalformedLine`] for the first line that is not valid JSON.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>, StoreError> {
    let mut values = Vec::new();
    for_each_line(path, |line, text| {
        let value =
            serde_json::from_str(text).map_err(|e| StoreError::malformed_line(path, line, e))?;
        values.push(value);
        Ok(())
    })?;
    Ok(values)
}

/// Reads every JSON value from a JSONL file, skipping lines that are not
/// valid JSON.
///
/// A writer that died mid-append leaves such a line behind; each one is
/// logged with its 1-based line number. Returns the values and the number of
/// skipped lines.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read.
pub fn read_jsonl_lenient(path: &Path) -> Result<(Vec<Value>, usize), StoreError> {
    let mut values = Vec::new();
    let mut skipped = 0_usize;
    for_each_line(path, |line, text| {
        match serde_json::from_str(text) {
            Ok(value) => values.push(value),
            Err(error) => {
                warn!(path = %path.display(), line, error = %error, "skipping malformed JSONL line");
                skipped += 1;
            }
        }
        Ok(())
    })?;
    Ok((values, skipped))
}

/// Calls `f` with the 1-based number and text of every non-blank line.
fn for_each_line(
    path: &Path,
    mut f: impl FnMut(usize, &str) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        f(index + 1, &line)?;
    }
    Ok(())
}
