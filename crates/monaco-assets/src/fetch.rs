//! Archive download over HTTPS
//!
//! Handles the single GET request against the registry, streaming the
//! response body to a file on disk.

use reqwest::blocking::Client;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while downloading an archive
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (DNS, connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// IO error writing the destination file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP fetcher for registry archives
///
/// TLS is validated against the rustls/webpki trusted root bundle.
pub struct AssetFetcher {
    client: Client,
}

impl AssetFetcher {
    /// Create a new fetcher
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("monaco-assets/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Download a URL to a file, streaming the body to disk.
    ///
    /// Returns the number of bytes written. Any non-success status is an
    /// error; there are no retries.
    pub fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(dest)?;
        let written = io::copy(&mut response, &mut file)?;

        debug!(url, bytes = written, "downloaded archive");
        Ok(written)
    }
}
