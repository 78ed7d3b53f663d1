//! Error types for metadata lookups.

use thiserror::Error;

/// Errors that can occur while looking up a DOI.
///
/// Not-found and forbidden responses are not errors; they are expected
/// outcomes reported through [`LookupOutcome`](super::LookupOutcome).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error looking up {url}: {source}")]
    Network {
        /// The lookup URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout looking up {url}")]
    Timeout {
        /// The lookup URL.
        url: String,
    },

    /// HTTP error response other than 403/404.
    #[error("HTTP {status} looking up {url}")]
    HttpStatus {
        /// The lookup URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A successful response whose body is not a JSON object.
    #[error("invalid response body from {url}: {reason}")]
    InvalidBody {
        /// The lookup URL.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The lookup URL could not be built from the base URL and DOI.
    #[error("invalid lookup URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid-body error.
    pub fn invalid_body(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBody {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a client construction error.
    pub fn client(source: reqwest::Error) -> Self {
        Self::Client { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_http_status_display() {
        let error = ApiError::http_status("https://api.unpaywall.org/v2/10.1/x", 500);
        let msg = error.to_string();
        assert!(msg.contains("500"), "Expected '500' in: {msg}");
        assert!(msg.contains("10.1/x"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_api_error_invalid_body_display() {
        let error = ApiError::invalid_body("https://api.unpaywall.org/v2/10.1/x", "expected object");
        assert!(error.to_string().contains("expected object"));
    }
}
