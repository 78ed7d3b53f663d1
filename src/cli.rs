//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use unpaywaller_core::config::{
    DEFAULT_ATTEMPTED_JSONL, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_INPUT_CSV,
    DEFAULT_MERGED_JSONL, DEFAULT_METADATA_JSONL, DEFAULT_PARSED_DIR, DEFAULT_PDF_DIR,
    DEFAULT_READ_TIMEOUT_SECS, HttpTimeouts,
};
use unpaywaller_core::input::{DEFAULT_DOI_COLUMN, DEFAULT_ID_COLUMN};
use unpaywaller_core::logging::DEFAULT_LOG_FILE;
use unpaywaller_core::merge::Section;
use unpaywaller_core::{FetchConfig, ID_FIELD, InputOptions, MergeConfig};

/// Harvest open-access metadata and PDFs from Unpaywall.
///
/// `fetch` looks up each DOI of an identifier CSV and downloads any
/// open-access PDF; it can be interrupted and rerun at any time. `merge`
/// joins text from externally parsed PDFs back into the metadata records.
#[derive(Parser, Debug)]
#[command(name = "unpaywaller")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append log output to this file as well as the console
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    /// Log to the console only
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Disable colored console output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up DOIs and download open-access PDFs (resumable)
    Fetch(FetchArgs),
    /// Merge parsed PDF text into the metadata records
    Merge(MergeArgs),
}

/// Arguments for `unpaywaller fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Contact address sent with every API request
    #[arg(short, long)]
    pub email: String,

    /// Unpaywall API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Identifier CSV with DOI and id columns (Latin-1 decoded)
    #[arg(short, long, default_value = DEFAULT_INPUT_CSV)]
    pub input: PathBuf,

    /// Metadata JSONL, appended to
    #[arg(short, long, default_value = DEFAULT_METADATA_JSONL)]
    pub metadata: PathBuf,

    /// Attempted-id checkpoint JSONL
    #[arg(long, default_value = DEFAULT_ATTEMPTED_JSONL)]
    pub attempted: PathBuf,

    /// Directory receiving `<id>.pdf` files
    #[arg(long, default_value = DEFAULT_PDF_DIR)]
    pub pdf_dir: PathBuf,

    /// Name of the DOI column
    #[arg(long, default_value = DEFAULT_DOI_COLUMN)]
    pub doi_column: String,

    /// Name of the id column (falls back to `id` when absent)
    #[arg(long, default_value = DEFAULT_ID_COLUMN)]
    pub id_column: String,

    /// Field delimiter of the input file (single ASCII character or `tab`)
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// Read timeout in seconds (1-3600)
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    pub read_timeout: u64,

    /// Process at most this many pending identifiers
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Top-level field to drop from each record (repeatable; replaces the defaults)
    #[arg(long = "strip-field", value_name = "FIELD")]
    pub strip_fields: Vec<String>,
}

impl FetchArgs {
    /// Builds the library configuration. Validation happens in the library.
    pub fn into_config(self) -> FetchConfig {
        let mut config = FetchConfig::new(self.email);
        config.base_url = self.base_url;
        config.input_csv = self.input;
        config.input = InputOptions {
            doi_column: self.doi_column,
            id_column: self.id_column,
            delimiter: self.delimiter,
        };
        config.metadata_jsonl = self.metadata;
        config.attempted_jsonl = self.attempted;
        config.pdf_dir = self.pdf_dir;
        config.timeouts = HttpTimeouts {
            connect_secs: self.connect_timeout,
            read_secs: self.read_timeout,
        };
        config.limit = self.limit;
        if !self.strip_fields.is_empty() {
            config.irrelevant_fields = self.strip_fields;
        }
        config
    }
}

/// Arguments for `unpaywaller merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Directory searched recursively for parsed-PDF `*.json` files
    #[arg(short, long, default_value = DEFAULT_PARSED_DIR)]
    pub parsed_dir: PathBuf,

    /// Metadata JSONL produced by `fetch`
    #[arg(short, long, default_value = DEFAULT_METADATA_JSONL)]
    pub metadata: PathBuf,

    /// Merged JSONL output (overwritten)
    #[arg(short, long, default_value = DEFAULT_MERGED_JSONL)]
    pub output: PathBuf,

    /// Parsed section to take text from: body_text or abstract
    #[arg(long, default_value_t = Section::BodyText)]
    pub section: Section,

    /// Record field holding the join identifier
    #[arg(long, default_value = ID_FIELD)]
    pub id_field: String,
}

impl MergeArgs {
    pub fn into_config(self) -> MergeConfig {
        MergeConfig {
            parsed_dir: self.parsed_dir,
            metadata_jsonl: self.metadata,
            output_jsonl: self.output,
            section: self.section,
            id_field: self.id_field,
        }
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    if value.eq_ignore_ascii_case("tab") || value == "\\t" {
        return Ok(b'\t');
    }
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(format!(
            "delimiter must be a single ASCII character, got '{value}'"
        )),
    }
}
