//! Streaming PDF downloads.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use unpaywaller_core::config::HttpTimeouts;
//! use unpaywaller_core::download::PdfDownloader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = PdfDownloader::new(HttpTimeouts::default())?;
//! let bytes = downloader
//!     .download("https://example.com/paper.pdf", Path::new("data/raw_pdfs/abc123.pdf"))
//!     .await?;
//! println!("wrote {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::PdfDownloader;
pub use error::DownloadError;
