//! CLI entry point for the unpaywaller tool.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use unpaywaller_core::logging::{color_disabled, default_level};
use unpaywaller_core::{LoggingOptions, init_logging, run_fetch, run_merge};

mod cli;

use cli::{Cli, Command};

// Requests are issued one at a time, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let logging = LoggingOptions {
        default_level: default_level(cli.verbose, cli.quiet),
        log_file: (!cli.no_log_file).then(|| cli.log_file.clone()),
        no_color: color_disabled(cli.no_color),
    };
    init_logging(&logging).context("failed to set up logging")?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Command::Fetch(args) => {
            let config = args.into_config();
            info!(
                input = %config.input_csv.display(),
                pdf_dir = %config.pdf_dir.display(),
                "unpaywaller fetch starting"
            );
            let stats = run_fetch(&config).await.context("fetch failed")?;
            info!(
                records = stats.records_written,
                pdfs = stats.pdfs_downloaded,
                "fetch finished"
            );
        }
        Command::Merge(args) => {
            let config = args.into_config();
            info!(parsed_dir = %config.parsed_dir.display(), "unpaywaller merge starting");
            let stats = run_merge(&config).context("merge failed")?;
            info!(
                records = stats.records,
                matched = stats.matched,
                "merge finished"
            );
        }
    }

    Ok(())
}
