//! HTTP client for the Unpaywall v2 REST API.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{DEFAULT_BASE_URL, HttpTimeouts};
use crate::http_client::build_http_client;
use crate::record::MetadataRecord;

use super::ApiError;

/// Result of a lookup that reached the API and got an expected answer.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The API knows the DOI.
    Found(MetadataRecord),
    /// 404: the DOI is unknown to the API.
    NotFound {
        /// The API's explanation, when the body carried one.
        message: Option<String>,
    },
    /// 403: the API refused the request.
    Forbidden,
}

/// Looks up DOIs against the Unpaywall API.
///
/// Every request carries the contact `email` query parameter the API
/// requires.
#[derive(Clone)]
pub struct UnpaywallClient {
    client: Client,
    base_url: String,
    email: String,
}

impl UnpaywallClient {
    /// Creates a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(email: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        Self::with_base_url(email, DEFAULT_BASE_URL, timeouts)
    }

    /// Creates a client against a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn with_base_url(
        email: impl Into<String>,
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, ApiError> {
        let client = build_http_client(timeouts).map_err(ApiError::client)?;
        Ok(Self::with_client(client, email, base_url))
    }

    /// Wraps an existing HTTP client, sharing its connection pool.
    pub fn with_client(
        client: Client,
        email: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            email: email.into(),
        }
    }

    /// Builds `<base>/<doi>?email=<contact>`.
    ///
    /// Each `/`-separated DOI segment is percent-encoded on its own, so the
    /// DOI's slashes stay path separators as the API expects while `?`, `#`
    /// and friends inside a suffix cannot break the URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the result does not parse.
    pub fn lookup_url(&self, doi: &str) -> Result<Url, ApiError> {
        let encoded: Vec<String> = doi
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let raw = format!("{}/{}", self.base_url, encoded.join("/"));
        let mut url = Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw.clone()))?;
        url.query_pairs_mut().append_pair("email", &self.email);
        Ok(url)
    }

    /// Looks up one DOI.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for statuses other than 2xx/403/404, transport
    /// failures, and 2xx bodies that are not JSON objects.
    #[instrument(skip(self), fields(doi = %doi))]
    pub async fn lookup(&self, doi: &str) -> Result<LookupOutcome, ApiError> {
        let url = self.lookup_url(doi)?;
        let url_str = url.to_string();
        debug!(method = "GET", url = %url_str, "request sent; waiting for response");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&url_str, e))?;

        let status = response.status();
        info!(method = "GET", url = %url_str, status = status.as_u16(), "lookup response");

        match status {
            StatusCode::NOT_FOUND => {
                let message = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
                Ok(LookupOutcome::NotFound { message })
            }
            StatusCode::FORBIDDEN => Ok(LookupOutcome::Forbidden),
            status if !status.is_success() => {
                warn!(status = status.as_u16(), url = %url_str, "lookup errored");
                Err(ApiError::http_status(url_str, status.as_u16()))
            }
            _ => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ApiError::from_transport(&url_str, e))?;
                match serde_json::from_slice::<Value>(&body) {
                    Ok(Value::Object(fields)) => {
                        Ok(LookupOutcome::Found(MetadataRecord::from_map(fields)))
                    }
                    Ok(other) => Err(ApiError::invalid_body(
                        url_str,
                        format!("expected a JSON object, got {}", json_kind(&other)),
                    )),
                    Err(error) => Err(ApiError::invalid_body(url_str, error.to_string())),
                }
            }
        }
    }
}

impl std::fmt::Debug for UnpaywallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnpaywallClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
