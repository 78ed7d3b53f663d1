//! Streaming PDF downloader.
//!
//! The destination file is created only once the server has answered with a
//! success status. From then on bytes are written as they arrive; if the
//! connection drops mid-body, whatever arrived stays on disk. There is no
//! cleanup and no retry.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::HttpTimeouts;
use crate::http_client::build_http_client;

use super::error::DownloadError;

/// Streams PDFs to caller-chosen paths.
#[derive(Debug, Clone)]
pub struct PdfDownloader {
    client: Client,
}

impl PdfDownloader {
    /// Creates a downloader with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(timeouts)?))
    }

    /// Wraps an existing HTTP client, sharing its connection pool.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `url` to exactly `dest`, returning the number of bytes written.
    ///
    /// `dest`'s parent directory must exist. An existing file at `dest` is
    /// truncated.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if `url` does not parse; nothing is requested.
    /// - [`DownloadError::HttpStatus`] for 4xx/5xx; no file is created.
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] for transport
    ///   failures; if the body was already streaming, the partial file is kept.
    /// - [`DownloadError::Io`] if the file cannot be created or written.
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        debug!("starting download");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(url, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), final_url = %response.url(), "download response");
        if !status.is_success() {
            warn!(status = status.as_u16(), "download errored");
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            && content_type.to_ascii_lowercase().starts_with("text/html")
        {
            // Often a landing or login page rather than the PDF; saved anyway.
            warn!(content_type, "PDF link returned HTML");
        }

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let bytes = stream_to_file(file, response, url, dest).await?;

        info!(bytes, "download complete");
        Ok(bytes)
    }
}

/// Streams the response body into `file`, flushing what arrived even when
/// the stream fails.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(error) => {
                writer
                    .flush()
                    .await
                    .map_err(|e| DownloadError::io(dest, e))?;
                warn!(bytes_written, "stream interrupted; keeping partial file");
                return Err(DownloadError::from_transport(url, error));
            }
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(dest, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader() -> PdfDownloader {
        PdfDownloader::new(HttpTimeouts::default()).unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_exact_bytes_to_dest() {
        let server = MockServer::start().await;
        let content = b"%PDF-1.4\nfake pdf body\n%%EOF";
        Mock::given(method("GET"))
            .and(path("/papers/x.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/pdf")
                    .set_body_bytes(content.to_vec()),
            )
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("abc123.pdf");

        let bytes = downloader()
            .download(&format!("{}/papers/x.pdf", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, content.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_download_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/final.pdf", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/final.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pdf".to_vec()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("abc123.pdf");

        downloader()
            .download(&format!("{}/landing", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"pdf");
    }

    #[tokio::test]
    async fn test_download_error_status_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("abc123.pdf");

        let result = downloader()
            .download(&format!("{}/gone.pdf", server.uri()), &dest)
            .await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus(404), got: {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_interrupted_body_keeps_partial_file() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Consume the whole request so closing sends FIN, not RST.
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 1000\r\n\r\n%PDF-partial",
                )
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("abc123.pdf");

        let result = downloader()
            .download(&format!("http://{addr}/x.pdf"), &dest)
            .await;
        server.await.unwrap();

        assert!(matches!(result, Err(DownloadError::Network { .. })), "got: {result:?}");
        assert!(!result.unwrap_err().is_fatal());
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-partial");
    }

    #[tokio::test]
    async fn test_download_invalid_url_makes_no_request() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("abc123.pdf");

        let result = downloader().download("not a url", &dest).await;

        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_missing_parent_dir_is_fatal_io() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pdf".to_vec()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing").join("abc123.pdf");

        let result = downloader()
            .download(&format!("{}/x.pdf", server.uri()), &dest)
            .await;

        let error = result.unwrap_err();
        assert!(error.is_fatal(), "got: {error:?}");
    }
}
