//! Identifier input: delimited files mapping DOIs to stable row identifiers.
//!
//! The input is a header-ful delimited file (CSV by default) with at least a
//! DOI column and a unique identifier column. Exports from bibliographic
//! databases are frequently Latin-1, so every field is decoded as ISO-8859-1:
//! each byte maps to the code point of the same value, which never fails.

mod doi;
mod error;

use std::path::Path;

use tracing::{debug, info, warn};

pub use doi::normalize_doi;
pub use error::InputError;

/// Default name of the DOI column.
pub const DEFAULT_DOI_COLUMN: &str = "doi";

/// Default name of the identifier column.
pub const DEFAULT_ID_COLUMN: &str = "uuid";

/// Identifier column used when the configured one is absent from the header.
pub const FALLBACK_ID_COLUMN: &str = "id";

/// A `(doi, id)` pair from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRecord {
    /// Normalized DOI.
    pub doi: String,
    /// Opaque, unique, stable identifier used to name output files.
    pub uuid: String,
}

impl IdentifierRecord {
    /// Creates a record from already-normalized parts.
    pub fn new(doi: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            doi: doi.into(),
            uuid: uuid.into(),
        }
    }
}

/// How to read the identifier input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    /// Header name of the DOI column.
    pub doi_column: String,
    /// Header name of the identifier column.
    pub id_column: String,
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            doi_column: DEFAULT_DOI_COLUMN.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            delimiter: b',',
        }
    }
}

/// Reads all `(doi, id)` pairs from a delimited file, in file order.
///
/// Rows with an empty identifier or an empty DOI are skipped with a warning,
/// as are identifiers that cannot be used as a file name (see
/// [`is_file_safe_id`]).
///
/// # Errors
///
/// Returns [`InputError`] if the file cannot be read, is not valid delimited
/// text, or lacks the DOI column or both identifier columns.
#[tracing::instrument(skip(options), fields(path = %path.display()))]
pub fn read_identifiers(
    path: &Path,
    options: &InputOptions,
) -> Result<Vec<IdentifierRecord>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| InputError::csv(path, e))?;

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(|e| InputError::csv(path, e))?
        .iter()
        .map(|field| decode_latin1(field).trim().to_string())
        .collect();

    let doi_index = column_index(&headers, &options.doi_column)
        .ok_or_else(|| InputError::missing_column(path, &options.doi_column))?;
    let id_index = column_index(&headers, &options.id_column)
        .or_else(|| {
            let fallback = column_index(&headers, FALLBACK_ID_COLUMN);
            if fallback.is_some() {
                debug!(
                    configured = %options.id_column,
                    fallback = FALLBACK_ID_COLUMN,
                    "identifier column not found; using fallback"
                );
            }
            fallback
        })
        .ok_or_else(|| InputError::missing_column(path, &options.id_column))?;

    let mut records = Vec::new();
    let mut skipped = 0_usize;
    for (index, row) in reader.byte_records().enumerate() {
        let row = row.map_err(|e| InputError::csv(path, e))?;
        // Header is line 1.
        let line = index + 2;

        let id = row
            .get(id_index)
            .map(decode_latin1)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        if id.is_empty() {
            warn!(line, "row has no identifier; skipping");
            skipped += 1;
            continue;
        }

        if !is_file_safe_id(&id) {
            warn!(line, id = %id, "identifier is not usable as a file name; skipping");
            skipped += 1;
            continue;
        }

        let raw_doi = row.get(doi_index).map(decode_latin1).unwrap_or_default();
        let Some(doi) = normalize_doi(&raw_doi) else {
            warn!(line, id = %id, "row has no DOI; skipping");
            skipped += 1;
            continue;
        };

        records.push(IdentifierRecord::new(doi, id));
    }

    info!(rows = records.len(), skipped, "read identifier input");
    Ok(records)
}

/// Whether `id` can name `<id>.pdf` inside the PDF directory.
///
/// The id must be a single path component: no separators, no `..`, no
/// control characters.
#[must_use]
pub fn is_file_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && !id.contains("..")
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control)
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

/// Decodes ISO-8859-1 bytes: byte `n` is code point `U+00nn`.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("input.csv");
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_read_identifiers_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = write_input(
            &dir,
            b"title,doi,uuid\nA,10.1016/j.intell.2017.01.008,abc123\nB,10.31228/osf.io/3vuzf,def456\n",
        );

        let records = read_identifiers(&path, &InputOptions::default()).unwrap();
        assert_eq!(
            records,
            vec![
                IdentifierRecord::new("10.1016/j.intell.2017.01.008", "abc123"),
                IdentifierRecord::new("10.31228/osf.io/3vuzf", "def456"),
            ]
        );
    }

    #[test]
    fn test_read_identifiers_decodes_latin1() {
        let dir = TempDir::new().unwrap();
        // 0xE9 is 'é' in Latin-1 and invalid as a lone UTF-8 byte.
        let mut bytes = b"title,doi,uuid\nCaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b",10.1234/x,id\xE9\n");
        let path = write_input(&dir, &bytes);

        let records = read_identifiers(&path, &InputOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uuid, "id\u{e9}");
    }

    #[test]
    fn test_read_identifiers_falls_back_to_id_column() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, b"doi,id\n10.1234/x,abc123\n");
        let records = read_identifiers(&path, &InputOptions::default()).unwrap();
        assert_eq!(records, vec![IdentifierRecord::new("10.1234/x", "abc123")]);
    }

    #[test]
    fn test_read_identifiers_skips_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_input(
            &dir,
            b"doi,uuid\n,no-doi\n10.1234/x,\n  ,blank\n10.5555/ok,good\n",
        );

        let records = read_identifiers(&path, &InputOptions::default()).unwrap();
        assert_eq!(records, vec![IdentifierRecord::new("10.5555/ok", "good")]);
    }

    #[test]
    fn test_read_identifiers_skips_ids_that_are_not_file_names() {
        let dir = TempDir::new().unwrap();
        let path = write_input(
            &dir,
            b"doi,uuid\n10.1/a,2020/7\n10.1/b,..\\up\n10.1/c,../escape\n10.1/d,good\n",
        );

        let records = read_identifiers(&path, &InputOptions::default()).unwrap();
        assert_eq!(records, vec![IdentifierRecord::new("10.1/d", "good")]);
    }

    #[test]
    fn test_is_file_safe_id() {
        assert!(is_file_safe_id("abc123"));
        assert!(is_file_safe_id("2b1e-44f0.v2"));
        assert!(!is_file_safe_id(""));
        assert!(!is_file_safe_id("."));
        assert!(!is_file_safe_id(".."));
        assert!(!is_file_safe_id("2020/7"));
        assert!(!is_file_safe_id("a\\b"));
        assert!(!is_file_safe_id("../x"));
        assert!(!is_file_safe_id("a\tb"));
    }

    #[test]
    fn test_read_identifiers_custom_columns_and_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, b"DOI;row_id\nhttps://doi.org/10.1234/x;r1\n");
        let options = InputOptions {
            doi_column: "DOI".to_string(),
            id_column: "row_id".to_string(),
            delimiter: b';',
        };

        let records = read_identifiers(&path, &options).unwrap();
        assert_eq!(records, vec![IdentifierRecord::new("10.1234/x", "r1")]);
    }

    #[test]
    fn test_read_identifiers_missing_doi_column() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, b"title,uuid\nA,abc\n");

        let err = read_identifiers(&path, &InputOptions::default()).unwrap_err();
        match err {
            InputError::MissingColumn { column, .. } => assert_eq!(column, "doi"),
            other => panic!("Expected MissingColumn, got: {other:?}"),
        }
    }

    #[test]
    fn test_read_identifiers_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_identifiers(&dir.path().join("absent.csv"), &InputOptions::default())
            .unwrap_err();
        assert!(matches!(err, InputError::Io { .. }), "got: {err:?}");
    }
}
