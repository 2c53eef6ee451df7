//! Processed-document ledger: the durable set of already-ingested URLs.
//!
//! The ledger is a pretty-printed JSON array of URL strings in insertion
//! order. It is loaded once at start-up and rewritten in full on every
//! [`Ledger::record`] via [`crate::durable::write_atomic`], so a crash at any
//! point leaves either the old or the new set on disk, never a torn file.
//!
//! An entry is only ever recorded after the document's artifact has been
//! flushed. A crash between the two steps therefore costs one re-processed
//! document, never a ledgered URL without text.

use crate::durable;
use crate::error::MonitorError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed set of processed document URLs.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    /// Insertion order, written to disk as-is.
    urls: Vec<String>,
    index: HashSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`.
    ///
    /// A missing file is an empty ledger. A file that cannot be read or is
    /// not a JSON array of strings is logged as corrupt and also yields an
    /// empty ledger: every document is then treated as unseen, trading
    /// re-processing for availability.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path).await {
            Ok(urls) => {
                info!("Ledger loaded: {} processed documents", urls.len());
                Self::from_urls(path, urls)
            }
            Err(e) => {
                warn!("{e}; starting with an empty ledger");
                Self::from_urls(path, Vec::new())
            }
        }
    }

    /// Strict variant of [`Ledger::load`] that surfaces corruption.
    pub async fn try_load(path: &Path) -> Result<Vec<String>, MonitorError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting fresh", path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(MonitorError::LedgerCorrupt {
                    path: path.to_path_buf(),
                    detail: format!("unreadable: {e}"),
                })
            }
        };

        serde_json::from_slice::<Vec<String>>(&raw).map_err(|e| MonitorError::LedgerCorrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    fn from_urls(path: PathBuf, urls: Vec<String>) -> Self {
        let mut ledger = Self {
            path,
            urls: Vec::with_capacity(urls.len()),
            index: HashSet::with_capacity(urls.len()),
        };
        for url in urls {
            if ledger.index.insert(url.clone()) {
                ledger.urls.push(url);
            }
        }
        ledger
    }

    /// Whether `url` has already been ingested.
    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    /// Add `url` and persist the whole set before returning.
    ///
    /// Recording a URL that is already present still rewrites the file, so a
    /// re-run after a crash repairs a ledger that lost its last write.
    pub async fn record(&mut self, url: &str) -> Result<(), MonitorError> {
        let added = self.index.insert(url.to_string());
        if added {
            self.urls.push(url.to_string());
        }

        if let Err(e) = self.persist().await {
            // Keep memory and disk in agreement.
            if added {
                self.index.remove(url);
                self.urls.pop();
            }
            return Err(e);
        }
        debug!("Ledger recorded {url} ({} total)", self.urls.len());
        Ok(())
    }

    /// URLs in insertion order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), MonitorError> {
        let write_err = |source: std::io::Error| MonitorError::LedgerWriteFailed {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(&self.urls)
            .map_err(|e| MonitorError::Internal(format!("ledger serialisation: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        durable::write_atomic(&self.path, &json)
            .await
            .map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(dir.path().join("processed_pdfs.json")).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_pdfs.json");
        std::fs::write(&path, "[\"https://site/a.pdf\", ").unwrap();

        assert!(matches!(
            Ledger::try_load(&path).await,
            Err(MonitorError::LedgerCorrupt { .. })
        ));
        let ledger = Ledger::load(&path).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn wrong_shape_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_pdfs.json");
        std::fs::write(&path, r#"{"urls": []}"#).unwrap();
        assert!(Ledger::try_load(&path).await.is_err());
    }

    #[tokio::test]
    async fn record_persists_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/processed_pdfs.json");

        let mut ledger = Ledger::load(&path).await;
        ledger.record("https://site/b.pdf").await.unwrap();
        ledger.record("https://site/a.pdf").await.unwrap();
        ledger.record("https://site/b.pdf").await.unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["https://site/b.pdf", "https://site/a.pdf"]);
        assert!(!durable::tmp_sibling(&path).exists());

        let reloaded = Ledger::load(&path).await;
        assert!(reloaded.contains("https://site/a.pdf"));
        assert_eq!(reloaded.urls(), ledger.urls());
    }

    #[tokio::test]
    async fn duplicate_entries_on_disk_are_collapsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_pdfs.json");
        std::fs::write(&path, r#"["https://site/a.pdf","https://site/a.pdf"]"#).unwrap();
        assert_eq!(Ledger::load(&path).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_record_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        // A directory where the ledger file should be makes the rename fail.
        let path = dir.path().join("processed_pdfs.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("blocker"), "x").unwrap();

        let mut ledger = Ledger::load(&path).await;
        assert!(ledger.record("https://site/a.pdf").await.is_err());
        assert!(!ledger.contains("https://site/a.pdf"));
        assert!(ledger.is_empty());
        assert!(!durable::tmp_sibling(&path).exists());
    }
}
