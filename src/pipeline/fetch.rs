//! HTTP fetch: download raw bytes for a URL.
//!
//! The body is taken as raw bytes, never decoded as text, so PDFs survive
//! the transfer unchanged. The same fetcher serves the target HTML page
//! during discovery; the scraper decodes that body itself.

use crate::error::{DocumentError, MonitorError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Downloads the body at a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` as raw bytes. Non-success statuses are errors.
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DocumentError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("pricelist-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DocumentError> {
        info!("Downloading: {}", url);

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                DocumentError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                DocumentError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(map_err)?;

        if !response.status().is_success() {
            return Err(DocumentError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(map_err)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Reject bodies that do not start with `%PDF`.
///
/// Catches HTML error pages served with a 200 status before they reach the
/// renderer.
pub fn ensure_pdf(url: &str, bytes: &[u8]) -> Result<(), DocumentError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    Err(DocumentError::NotAPdf {
        url: url.to_string(),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic_is_accepted() {
        assert!(ensure_pdf("https://site/a.pdf", b"%PDF-1.7\n...").is_ok());
    }

    #[test]
    fn html_error_page_is_rejected() {
        let err = ensure_pdf("https://site/a.pdf", b"<!DOCTYPE html>").unwrap_err();
        match err {
            DocumentError::NotAPdf { url, magic } => {
                assert_eq!(url, "https://site/a.pdf");
                assert_eq!(magic, b"<!DO".to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(ensure_pdf("https://site/a.pdf", b"").is_err());
    }
}
