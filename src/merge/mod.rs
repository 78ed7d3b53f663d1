//! Join of externally parsed PDF text into metadata records.
//!
//! Parsed PDFs arrive as one JSON file per document, named `<id>.json`, in
//! the layout produced by s2orc-doc2json:
//!
//! ```json
//! {"pdf_parse": {"abstract": [{"text": "..."}], "body_text": [{"text": "..."}, ...]}}
//! ```
//!
//! The merge builds a lookup from file stem to the selected section's text
//! (paragraphs joined by a single space, in file order), then walks the
//! metadata JSONL in order and sets a `content` field on every record. The
//! output depends only on the inputs, so reruns are byte-identical.

mod error;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::MergeConfig;
use crate::store::{JsonlWriter, read_jsonl_lenient};

pub use error::MergeError;

/// Field added to every merged record.
pub const CONTENT_FIELD: &str = "content";

/// Which section of a parsed PDF supplies the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Section {
    /// Full body paragraphs.
    #[default]
    BodyText,
    /// Abstract paragraphs only.
    Abstract,
}

impl Section {
    /// Key of the section inside `pdf_parse`.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::BodyText => "body_text",
            Self::Abstract => "abstract",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "body_text" => Ok(Self::BodyText),
            "abstract" => Ok(Self::Abstract),
            other => Err(format!(
                "unknown section '{other}' (expected 'body_text' or 'abstract')"
            )),
        }
    }
}

/// Counters reported by a merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Parsed files that contributed text.
    pub parsed_files: usize,
    /// Metadata records written.
    pub records: usize,
    /// Records that received parsed text.
    pub matched: usize,
    /// Records left with empty content.
    pub unmatched: usize,
    /// Metadata lines dropped because they were not valid JSON.
    pub malformed_lines: usize,
}

/// Extracts a section's text from a parsed-PDF document.
///
/// Returns `None` when `pdf_parse.<section>` is not an array. Paragraphs
/// without a string `text` are skipped.
#[must_use]
pub fn retrieve_text(parsed: &Value, section: Section) -> Option<String> {
    let paragraphs = parsed
        .get("pdf_parse")?
        .get(section.key())?
        .as_array()?;
    let texts: Vec<&str> = paragraphs
        .iter()
        .filter_map(|paragraph| paragraph.get("text").and_then(Value::as_str))
        .collect();
    Some(texts.join(" "))
}

/// Builds the id → text lookup from every `*.json` under `dir`, recursively.
///
/// Files are visited in sorted path order; when two files share a stem, the
/// later one wins. Files that are not JSON or lack the section are skipped
/// with a warning. A missing directory yields an empty lookup.
///
/// # Errors
///
/// Returns [`MergeError::InvalidDir`] if `dir` cannot be expressed as a
/// search pattern and [`MergeError::Io`] if a matched file cannot be read.
#[instrument(skip_all, fields(dir = %dir.display(), section = %section))]
pub fn build_lookup(dir: &Path, section: Section) -> Result<HashMap<String, String>, MergeError> {
    if !dir.is_dir() {
        warn!("parsed-PDF directory does not exist; every record will be unmatched");
        return Ok(HashMap::new());
    }

    let dir_str = dir
        .to_str()
        .ok_or_else(|| MergeError::invalid_dir(dir, "path is not valid UTF-8"))?;
    let pattern = format!("{}/**/*.json", glob::Pattern::escape(dir_str));
    let entries =
        glob::glob(&pattern).map_err(|e| MergeError::invalid_dir(dir, e.to_string()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(error) => warn!(path = %error.path().display(), error = %error.error(), "skipping unreadable entry"),
        }
    }
    paths.sort();

    let mut lookup = HashMap::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(path = %path.display(), "skipping file with non-UTF-8 name");
            continue;
        };
        let bytes = fs::read(&path).map_err(|e| MergeError::io(&path, e))?;
        let parsed: Value = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping file that is not JSON");
                continue;
            }
        };
        let Some(text) = retrieve_text(&parsed, section) else {
            warn!(path = %path.display(), "skipping file without pdf_parse.{section}");
            continue;
        };
        if lookup.insert(stem.to_string(), text).is_some() {
            debug!(id = stem, path = %path.display(), "duplicate parsed id; later file wins");
        }
    }

    info!(parsed = lookup.len(), "built parsed-text lookup");
    Ok(lookup)
}

/// Sets `content` on every record from `lookup`, preserving record order.
///
/// Records whose `id_field` is missing or unmatched get an empty string.
/// Lines that are not JSON objects pass through unchanged.
pub fn merge_records(
    lookup: &HashMap<String, String>,
    records: Vec<Value>,
    id_field: &str,
) -> (Vec<Value>, MergeStats) {
    let mut stats = MergeStats {
        parsed_files: lookup.len(),
        ..MergeStats::default()
    };
    let merged: Vec<Value> = records
        .into_iter()
        .map(|mut record| {
            stats.records += 1;
            let Value::Object(fields) = &mut record else {
                warn!("metadata line is not a JSON object; passing through");
                stats.unmatched += 1;
                return record;
            };
            let text = fields
                .get(id_field)
                .and_then(Value::as_str)
                .and_then(|id| lookup.get(id));
            match text {
                Some(text) => {
                    stats.matched += 1;
                    fields.insert(CONTENT_FIELD.to_string(), Value::String(text.clone()));
                }
                None => {
                    stats.unmatched += 1;
                    fields.insert(CONTENT_FIELD.to_string(), Value::String(String::new()));
                }
            }
            record
        })
        .collect();
    (merged, stats)
}

/// Runs the whole merge: lookup, join, and write the output file.
///
/// The output is written from scratch, so it may safely be the same path as
/// the metadata input. Metadata lines that are not valid JSON (torn by an
/// interrupted fetch) are logged and dropped.
///
/// # Errors
///
/// Returns [`MergeError`] if the metadata cannot be read, a parsed file
/// cannot be read, or the output cannot be written.
pub fn run_merge(config: &MergeConfig) -> Result<MergeStats, MergeError> {
    let lookup = build_lookup(&config.parsed_dir, config.section)?;
    let (records, malformed_lines) = read_jsonl_lenient(&config.metadata_jsonl)?;
    let (merged, mut stats) = merge_records(&lookup, records, &config.id_field);
    stats.malformed_lines = malformed_lines;

    let mut writer = JsonlWriter::create(&config.output_jsonl)?;
    for record in &merged {
        writer.write_record(record)?;
    }
    writer.sync()?;

    info!(
        records = stats.records,
        matched = stats.matched,
        unmatched = stats.unmatched,
        malformed_lines = stats.malformed_lines,
        output = %config.output_jsonl.display(),
        "merge complete"
    );
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn parsed(body: &[&str], abstract_: &[&str]) -> Value {
        json!({
            "paper_id": "ignored",
            "pdf_parse": {
                "abstract": abstract_.iter().map(|t| json!({"text": t, "section": "Abstract"})).collect::<Vec<_>>(),
                "body_text": body.iter().map(|t| json!({"text": t, "cite_spans": []})).collect::<Vec<_>>(),
            }
        })
    }

    #[test]
    fn test_retrieve_text_joins_with_single_space_in_order() {
        let doc = parsed(&["First para.", "Second para.", "Third."], &["Abs."]);
        assert_eq!(
            retrieve_text(&doc, Section::BodyText).as_deref(),
            Some("First para. Second para. Third.")
        );
        assert_eq!(retrieve_text(&doc, Section::Abstract).as_deref(), Some("Abs."));
    }

    #[test]
    fn test_retrieve_text_empty_and_missing_sections() {
        let doc = parsed(&[], &[]);
        assert_eq!(retrieve_text(&doc, Section::BodyText).as_deref(), Some(""));
        assert!(retrieve_text(&json!({"other": 1}), Section::BodyText).is_none());
        assert!(retrieve_text(&json!({"pdf_parse": {"body_text": null}}), Section::BodyText).is_none());
    }

    #[test]
    fn test_retrieve_text_skips_paragraphs_without_text() {
        let doc = json!({"pdf_parse": {"body_text": [{"text": "a"}, {"section": "x"}, {"text": "b"}]}});
        assert_eq!(retrieve_text(&doc, Section::BodyText).as_deref(), Some("a b"));
    }

    #[test]
    fn test_section_parse_and_display() {
        assert_eq!("abstract".parse::<Section>(), Ok(Section::Abstract));
        assert_eq!("body_text".parse::<Section>(), Ok(Section::BodyText));
        assert!("title".parse::<Section>().is_err());
        assert_eq!(Section::BodyText.to_string(), "body_text");
    }

    #[test]
    fn test_build_lookup_recurses_and_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("batch-1");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.json"), parsed(&["A1", "A2"], &[]).to_string()).unwrap();
        fs::write(nested.join("b.json"), parsed(&["B"], &[]).to_string()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("no_parse.json"), "{\"x\":1}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let lookup = build_lookup(dir.path(), Section::BodyText).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup["a"], "A1 A2");
        assert_eq!(lookup["b"], "B");
    }

    #[test]
    fn test_build_lookup_duplicate_stem_later_path_wins() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("1")).unwrap();
        fs::create_dir_all(dir.path().join("2")).unwrap();
        fs::write(dir.path().join("1/x.json"), parsed(&["old"], &[]).to_string()).unwrap();
        fs::write(dir.path().join("2/x.json"), parsed(&["new"], &[]).to_string()).unwrap();

        let lookup = build_lookup(dir.path(), Section::BodyText).unwrap();
        assert_eq!(lookup["x"], "new");
    }

    #[test]
    fn test_build_lookup_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let lookup = build_lookup(&dir.path().join("absent"), Section::BodyText).unwrap();
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_merge_records_sets_content_and_preserves_order() {
        let lookup = HashMap::from([("abc123".to_string(), "parsed text".to_string())]);
        let records = vec![
            json!({"doi": "10.1/a", "uuid": "abc123"}),
            json!({"doi": "10.1/b", "uuid": "zzz"}),
            json!({"doi": "10.1/c"}),
        ];

        let (merged, stats) = merge_records(&lookup, records, "uuid");

        assert_eq!(merged[0], json!({"doi": "10.1/a", "uuid": "abc123", "content": "parsed text"}));
        assert_eq!(merged[1], json!({"doi": "10.1/b", "uuid": "zzz", "content": ""}));
        assert_eq!(merged[2], json!({"doi": "10.1/c", "content": ""}));
        assert_eq!(
            stats,
            MergeStats {
                parsed_files: 1,
                records: 3,
                matched: 1,
                unmatched: 2,
                malformed_lines: 0,
            }
        );
    }

    #[test]
    fn test_merge_records_keeps_duplicate_records() {
        let lookup = HashMap::from([("a".to_string(), "t".to_string())]);
        let records = vec![json!({"uuid": "a"}), json!({"uuid": "a"})];

        let (merged, stats) = merge_records(&lookup, records, "uuid");
        assert_eq!(merged.len(), 2);
        assert_eq!(stats.matched, 2);
    }
}
