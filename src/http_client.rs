//! Shared HTTP client construction.
//!
//! One client serves both API lookups and PDF downloads so connections to
//! the API host are pooled across the whole batch.

use std::time::Duration;

use reqwest::Client;

use crate::config::HttpTimeouts;
use crate::user_agent;

/// Builds the HTTP client used for a run.
///
/// Redirects follow reqwest's default policy (up to 10 hops), which PDF
/// links on publisher sites routinely need.
///
/// # Errors
///
/// Returns the reqwest builder error when the TLS backend cannot initialize.
pub(crate) fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .read_timeout(Duration::from_secs(timeouts.read_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
        .build()
}
