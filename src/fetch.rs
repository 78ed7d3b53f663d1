//! Resumable fetch workflow.
//!
//! For every `(doi, id)` pair that has neither been attempted nor already
//! produced `<id>.pdf`:
//!
//! 1. record `id` in the attempted-set (durably, before any request),
//! 2. look the DOI up,
//! 3. on 404/403 move on without writing anything else,
//! 4. otherwise attach `id`, strip irrelevant fields, append the record,
//! 5. if the best open-access location has a PDF link, stream it to `<id>.pdf`.
//!
//! Remote failures are logged and the batch continues. Only local storage
//! failures stop the run, since continuing past them would break the
//! resume checkpoints.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, LookupOutcome, UnpaywallClient};
use crate::config::{ConfigError, FetchConfig};
use crate::download::{DownloadError, PdfDownloader};
use crate::http_client::build_http_client;
use crate::input::{IdentifierRecord, InputError, is_file_safe_id, read_identifiers};
use crate::store::{AttemptedSet, JsonlWriter, StoreError};

/// Errors that stop a fetch run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The identifier input could not be read.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The metadata store or attempted-set could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A PDF could not be written locally.
    #[error(transparent)]
    Download(DownloadError),

    /// The HTTP client could not be constructed.
    #[error(transparent)]
    Client(ApiError),

    /// The PDF directory could not be created.
    #[error("cannot create PDF directory {path}: {source}")]
    PdfDir {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Counters reported by a fetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Pairs read from the input.
    pub input: usize,
    /// Pairs skipped because they were attempted or downloaded before.
    pub already_done: usize,
    /// Pairs whose id cannot name a PDF file.
    pub rejected: usize,
    /// Pairs looked up in this run.
    pub attempted: usize,
    /// Lookups answered with 404.
    pub not_found: usize,
    /// Lookups answered with 403.
    pub forbidden: usize,
    /// Lookups that failed (other statuses, transport errors, bad bodies).
    pub lookup_failed: usize,
    /// Metadata records appended.
    pub records_written: usize,
    /// Records without a direct PDF link.
    pub no_pdf: usize,
    /// PDFs fully downloaded.
    pub pdfs_downloaded: usize,
    /// PDF downloads that failed remotely.
    pub download_failed: usize,
}

/// What happened to one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    NotFound,
    Forbidden,
    LookupFailed,
    NoPdf,
    Downloaded,
    DownloadFailed,
}

/// The fetch workflow with its open stores and HTTP clients.
#[derive(Debug)]
pub struct FetchWorkflow {
    api: UnpaywallClient,
    downloader: PdfDownloader,
    attempted: AttemptedSet,
    metadata: JsonlWriter,
    pdf_dir: PathBuf,
    irrelevant_fields: Vec<String>,
}

impl FetchWorkflow {
    /// Opens the stores named in `config` and builds one shared HTTP client.
    ///
    /// Creates the PDF directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the HTTP client cannot be built or a store
    /// or directory cannot be opened.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config.timeouts)
            .map_err(|e| FetchError::Client(ApiError::client(e)))?;
        let api = UnpaywallClient::with_client(client.clone(), &config.email, &config.base_url);
        let downloader = PdfDownloader::with_client(client);

        fs::create_dir_all(&config.pdf_dir).map_err(|source| FetchError::PdfDir {
            path: config.pdf_dir.clone(),
            source,
        })?;
        let attempted = AttemptedSet::load(&config.attempted_jsonl)?;
        let metadata = JsonlWriter::append(&config.metadata_jsonl)?;

        Ok(Self {
            api,
            downloader,
            attempted,
            metadata,
            pdf_dir: config.pdf_dir.clone(),
            irrelevant_fields: config.irrelevant_fields.clone(),
        })
    }

    /// Path of the PDF for `id`.
    #[must_use]
    pub fn pdf_path(&self, id: &str) -> PathBuf {
        pdf_path(&self.pdf_dir, id)
    }

    /// Whether `id` needs no further work: attempted before or downloaded.
    #[must_use]
    pub fn is_done(&self, id: &str) -> bool {
        self.attempted.contains(id) || self.pdf_path(id).exists()
    }

    /// Processes every pending pair in input order.
    ///
    /// Repeated ids are looked up once. Ids that cannot name a file are
    /// skipped. At most `limit` distinct pending ids are looked up when a
    /// limit is given.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only for local storage failures; everything
    /// remote is logged and counted.
    pub async fn run(
        &mut self,
        records: &[IdentifierRecord],
        limit: Option<usize>,
    ) -> Result<FetchStats, FetchError> {
        let mut stats = FetchStats {
            input: records.len(),
            ..FetchStats::default()
        };

        let mut seen = HashSet::new();
        let mut pending: Vec<&IdentifierRecord> = Vec::new();
        for record in records {
            if !is_file_safe_id(&record.uuid) {
                warn!(id = %record.uuid, "identifier is not usable as a file name; skipping");
                stats.rejected += 1;
            } else if self.is_done(&record.uuid) {
                stats.already_done += 1;
            } else if !seen.insert(record.uuid.as_str()) {
                debug!(id = %record.uuid, "duplicate input row; skipping");
                stats.already_done += 1;
            } else {
                pending.push(record);
            }
        }
        info!("{} left.", pending.len());

        for record in pending.into_iter().take(limit.unwrap_or(usize::MAX)) {
            stats.attempted += 1;
            match self.process(record).await? {
                ItemOutcome::NotFound => stats.not_found += 1,
                ItemOutcome::Forbidden => stats.forbidden += 1,
                ItemOutcome::LookupFailed => stats.lookup_failed += 1,
                ItemOutcome::NoPdf => {
                    stats.records_written += 1;
                    stats.no_pdf += 1;
                }
                ItemOutcome::Downloaded => {
                    stats.records_written += 1;
                    stats.pdfs_downloaded += 1;
                }
                ItemOutcome::DownloadFailed => {
                    stats.records_written += 1;
                    stats.download_failed += 1;
                }
            }
        }

        info!(
            input = stats.input,
            already_done = stats.already_done,
            rejected = stats.rejected,
            attempted = stats.attempted,
            not_found = stats.not_found,
            forbidden = stats.forbidden,
            lookup_failed = stats.lookup_failed,
            records_written = stats.records_written,
            no_pdf = stats.no_pdf,
            pdfs_downloaded = stats.pdfs_downloaded,
            download_failed = stats.download_failed,
            "fetch complete"
        );
        Ok(stats)
    }

    #[instrument(skip_all, fields(doi = %record.doi, id = %record.uuid))]
    async fn process(&mut self, record: &IdentifierRecord) -> Result<ItemOutcome, FetchError> {
        self.attempted.record(&record.uuid)?;

        let mut metadata = match self.api.lookup(&record.doi).await {
            Ok(LookupOutcome::Found(metadata)) => metadata,
            Ok(LookupOutcome::NotFound { message }) => {
                info!(message = message.as_deref().unwrap_or(""), "not found; skipping");
                return Ok(ItemOutcome::NotFound);
            }
            Ok(LookupOutcome::Forbidden) => {
                info!("forbidden; skipping");
                return Ok(ItemOutcome::Forbidden);
            }
            Err(error) => {
                warn!(error = %error, "lookup failed; skipping");
                return Ok(ItemOutcome::LookupFailed);
            }
        };

        // Read before stripping: the link must survive any field configuration.
        let pdf_url = metadata.pdf_url();
        metadata.attach_identifier(&record.uuid);
        metadata.strip_fields(&self.irrelevant_fields);
        self.metadata.write_record(&metadata)?;

        let Some(pdf_url) = pdf_url else {
            info!("no open-access PDF link");
            return Ok(ItemOutcome::NoPdf);
        };

        let dest = self.pdf_path(&record.uuid);
        match self.downloader.download(&pdf_url, &dest).await {
            Ok(bytes) => {
                info!(bytes, path = %dest.display(), "downloaded/updated");
                Ok(ItemOutcome::Downloaded)
            }
            Err(error) if error.is_fatal() => Err(FetchError::Download(error)),
            Err(error) => {
                warn!(error = %error, url = %pdf_url, "PDF download failed");
                Ok(ItemOutcome::DownloadFailed)
            }
        }
    }
}

fn pdf_path(pdf_dir: &Path, id: &str) -> PathBuf {
    pdf_dir.join(format!("{id}.pdf"))
}

/// Reads the input named in `config` and runs the fetch workflow over it.
///
/// # Errors
///
/// Returns [`FetchError`] if the configuration is invalid, the input cannot
/// be read, or local storage fails.
pub async fn run_fetch(config: &FetchConfig) -> Result<FetchStats, FetchError> {
    config.validate()?;
    let records = read_identifiers(&config.input_csv, &config.input)?;
    let mut workflow = FetchWorkflow::new(config)?;
    workflow.run(&records, config.limit).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> FetchConfig {
        let mut config = FetchConfig::new("team@example.org");
        // Nothing listens here; tests below never reach the network.
        config.base_url = "http://127.0.0.1:9/v2".to_string();
        config.metadata_jsonl = dir.path().join("data.jsonl");
        config.attempted_jsonl = dir.path().join("attempted_uuids.jsonl");
        config.pdf_dir = dir.path().join("raw_pdfs");
        config
    }

    #[test]
    fn test_new_creates_pdf_dir() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let workflow = FetchWorkflow::new(&config).unwrap();
        assert!(config.pdf_dir.is_dir());
        assert_eq!(workflow.pdf_path("abc"), config.pdf_dir.join("abc.pdf"));
    }

    #[test]
    fn test_is_done_by_attempted_or_pdf() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.attempted_jsonl, "{\"row\":\"tried\"}\n").unwrap();
        fs::create_dir_all(&config.pdf_dir).unwrap();
        fs::write(config.pdf_dir.join("have.pdf"), b"pdf").unwrap();

        let workflow = FetchWorkflow::new(&config).unwrap();
        assert!(workflow.is_done("tried"));
        assert!(workflow.is_done("have"));
        assert!(!workflow.is_done("new"));
    }

    #[tokio::test]
    async fn test_run_with_everything_done_makes_no_requests() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.attempted_jsonl, "{\"row\":\"a\"}\n{\"row\":\"b\"}\n").unwrap();

        let mut workflow = FetchWorkflow::new(&config).unwrap();
        let records = vec![
            IdentifierRecord::new("10.1234/a", "a"),
            IdentifierRecord::new("10.1234/b", "b"),
        ];
        let stats = workflow.run(&records, None).await.unwrap();

        assert_eq!(stats.input, 2);
        assert_eq!(stats.already_done, 2);
        assert_eq!(stats.attempted, 0);
    }

    #[tokio::test]
    async fn test_run_skips_ids_that_are_not_file_names() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut workflow = FetchWorkflow::new(&config).unwrap();
        let records = vec![
            IdentifierRecord::new("10.1234/a", "2020/7"),
            IdentifierRecord::new("10.1234/b", "../outside"),
        ];
        let stats = workflow.run(&records, None).await.unwrap();

        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.attempted, 0);
        assert!(!workflow.attempted.contains("2020/7"));
        assert!(!dir.path().join("outside.pdf").exists());
    }

    #[tokio::test]
    async fn test_run_fetch_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.email = String::new();

        let result = run_fetch(&config).await;
        assert!(matches!(result, Err(FetchError::Config(_))), "got: {result:?}");
    }
}
