//! Unpaywaller Core Library
//!
//! Fetches open-access metadata and PDF fulltexts for a list of DOIs from the
//! Unpaywall API, and later joins externally parsed PDF text back into the
//! metadata records.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`input`] - Delimited identifier files (DOI + stable id)
//! - [`store`] - Append-only JSONL persistence and the attempted-set checkpoint
//! - [`api`] - Unpaywall lookup client
//! - [`download`] - Streaming PDF downloads
//! - [`fetch`] - Resumable fetch workflow tying the above together
//! - [`merge`] - Join of parsed-PDF text into metadata records
//! - [`config`] - Run configuration and validation
//! - [`logging`] - Console + file tracing subscriber setup

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod download;
pub mod fetch;
pub mod input;
pub mod logging;
pub mod merge;
pub mod record;
pub mod store;

mod http_client;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiError, LookupOutcome, UnpaywallClient};
pub use config::{ConfigError, FetchConfig, MergeConfig};
pub use download::{DownloadError, PdfDownloader};
pub use fetch::{FetchError, FetchStats, FetchWorkflow, run_fetch};
pub use input::{IdentifierRecord, InputError, InputOptions, read_identifiers};
pub use logging::{LoggingError, LoggingOptions, init_logging};
pub use merge::{MergeError, MergeStats, run_merge};
pub use record::{ID_FIELD, MetadataRecord, OaLocation};
pub use store::{AttemptedSet, JsonlWriter, StoreError};
