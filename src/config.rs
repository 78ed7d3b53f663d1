//! Run configuration for the fetch and merge workflows.
//!
//! Defaults mirror the on-disk layout the pipelines have always used
//! (`data/processed/data.jsonl`, `data/raw_pdfs/`, ...). The CLI overrides
//! individual values and then calls [`FetchConfig::validate`].

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::input::InputOptions;
use crate::merge::Section;
use crate::record::{DEFAULT_IRRELEVANT_FIELDS, ID_FIELD};

/// Default Unpaywall API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.unpaywall.org/v2";

/// Default HTTP connect timeout (60 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 60;

/// Default HTTP read timeout (5 minutes; PDF hosts can be slow).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Default identifier input file.
pub const DEFAULT_INPUT_CSV: &str = "data/processed/lens-scopus-wos.csv";
/// Default metadata store.
pub const DEFAULT_METADATA_JSONL: &str = "data/processed/data.jsonl";
/// Default attempted-set checkpoint.
pub const DEFAULT_ATTEMPTED_JSONL: &str = "data/attempted_uuids.jsonl";
/// Default PDF output directory.
pub const DEFAULT_PDF_DIR: &str = "data/raw_pdfs";
/// Default directory of parsed-PDF JSON files.
pub const DEFAULT_PARSED_DIR: &str = "data/processed_pdfs";
/// Default merged output file.
pub const DEFAULT_MERGED_JSONL: &str = "data/processed.jsonl";

/// Errors raised by configuration validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is outside its accepted range or shape.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// HTTP timeouts shared by API lookups and PDF downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Per-read idle timeout in seconds.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Everything the fetch workflow needs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Contact address sent with every lookup (API etiquette requirement).
    pub email: String,
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Identifier input file.
    pub input_csv: PathBuf,
    /// How to read the input file.
    pub input: InputOptions,
    /// Metadata JSONL store (appended).
    pub metadata_jsonl: PathBuf,
    /// Attempted-set checkpoint (appended).
    pub attempted_jsonl: PathBuf,
    /// Directory receiving `<id>.pdf` files.
    pub pdf_dir: PathBuf,
    /// Top-level keys stripped from records before persistence.
    pub irrelevant_fields: Vec<String>,
    /// HTTP timeouts.
    pub timeouts: HttpTimeouts,
    /// Process at most this many pending identifiers.
    pub limit: Option<usize>,
}

impl FetchConfig {
    /// Creates a configuration with default paths for the given contact address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            input_csv: PathBuf::from(DEFAULT_INPUT_CSV),
            input: InputOptions::default(),
            metadata_jsonl: PathBuf::from(DEFAULT_METADATA_JSONL),
            attempted_jsonl: PathBuf::from(DEFAULT_ATTEMPTED_JSONL),
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            irrelevant_fields: DEFAULT_IRRELEVANT_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            timeouts: HttpTimeouts::default(),
            limit: None,
        }
    }

    /// Validates values that would otherwise fail deep inside a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_email(&self.email)?;

        let base = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "base_url",
                format!("scheme '{}' is not supported", base.scheme()),
            ));
        }

        validate_timeout_secs("connect_timeout_secs", self.timeouts.connect_secs)?;
        validate_timeout_secs("read_timeout_secs", self.timeouts.read_secs)?;

        if self.input.doi_column.trim().is_empty() {
            return Err(ConfigError::invalid("doi_column", "must not be empty"));
        }
        if self.input.id_column.trim().is_empty() {
            return Err(ConfigError::invalid("id_column", "must not be empty"));
        }
        if self.limit == Some(0) {
            return Err(ConfigError::invalid("limit", "must be at least 1"));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.trim().is_empty() {
        return Err(ConfigError::invalid("email", "must not be empty"));
    }
    if email.chars().any(char::is_control) {
        return Err(ConfigError::invalid("email", "contains control characters"));
    }
    if !email.contains('@') {
        return Err(ConfigError::invalid(
            "email",
            format!("'{email}' is not an email address"),
        ));
    }
    Ok(())
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: 1..=3600"),
        ));
    }
    Ok(())
}

/// Everything the merge workflow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Directory searched recursively for parsed-PDF `*.json` files.
    pub parsed_dir: PathBuf,
    /// Metadata JSONL input.
    pub metadata_jsonl: PathBuf,
    /// Merged JSONL output (overwritten).
    pub output_jsonl: PathBuf,
    /// Which parsed section to extract text from.
    pub section: Section,
    /// Record field holding the join identifier.
    pub id_field: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            parsed_dir: PathBuf::from(DEFAULT_PARSED_DIR),
            metadata_jsonl: PathBuf::from(DEFAULT_METADATA_JSONL),
            output_jsonl: PathBuf::from(DEFAULT_MERGED_JSONL),
            section: Section::default(),
            id_field: ID_FIELD.to_string(),
        }
    }
}
