//! Tracing subscriber setup: console on stderr plus an optional log file.
//!
//! Library code only emits through `tracing` macros. Installing a subscriber
//! is the caller's choice; tests can use `tracing::subscriber::with_default`
//! instead of this module.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default log file, kept next to the working directory like the data tree.
pub const DEFAULT_LOG_FILE: &str = "unpaywalled.log";

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be opened for appending.
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        /// The log file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// How the subscriber should be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset or invalid.
    pub default_level: &'static str,
    /// Append records to this file as well as the console.
    pub log_file: Option<PathBuf>,
    /// Disable ANSI colors on the console.
    pub no_color: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_level: "info",
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            no_color: false,
        }
    }
}

/// Maps `-v`/`-q` to a filter directive. Quiet wins over verbose.
#[must_use]
pub fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Whether console colors should be off: the flag, `NO_COLOR`, or `TERM=dumb`.
#[must_use]
pub fn color_disabled(no_color_flag: bool) -> bool {
    let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    let dumb_terminal = std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false);
    no_color_flag || no_color_env || dumb_terminal
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `options.default_level`. A subscriber
/// that is already installed is left in place.
///
/// # Errors
///
/// Returns [`LoggingError::LogFile`] if the log file cannot be opened.
pub fn init_logging(options: &LoggingOptions) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_level));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!options.no_color);

    let file_layer = match &options.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| LoggingError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    if let Err(error) = installed {
        // Reported through the subscriber that is already installed.
        warn!(error = %error, "global subscriber already set; keeping it");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_from_flags() {
        assert_eq!(default_level(0, false), "info");
        assert_eq!(default_level(1, false), "debug");
        assert_eq!(default_level(2, false), "trace");
        assert_eq!(default_level(5, false), "trace");
        assert_eq!(default_level(0, true), "error");
        assert_eq!(default_level(2, true), "error");
    }

    #[test]
    fn test_color_disabled_by_flag() {
        assert!(color_disabled(true));
    }

    #[test]
    fn test_default_options_log_to_file() {
        let options = LoggingOptions::default();
        assert_eq!(options.default_level, "info");
        assert_eq!(options.log_file, Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert!(!options.no_color);
    }

    #[test]
    fn test_init_logging_twice_keeps_first_subscriber() {
        let options = LoggingOptions {
            log_file: None,
            no_color: true,
            ..LoggingOptions::default()
        };

        assert!(init_logging(&options).is_ok());
        assert!(init_logging(&options).is_ok());
    }

    #[test]
    fn test_init_logging_unopenable_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as an append-only file.
        let options = LoggingOptions {
            log_file: Some(dir.path().to_path_buf()),
            ..LoggingOptions::default()
        };

        let result = init_logging(&options);
        assert!(matches!(result, Err(LoggingError::LogFile { .. })));
    }
}
