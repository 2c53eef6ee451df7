//! Error types for the pricelist-monitor library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`MonitorError`]: **Run-level**: the batch run cannot proceed at all
//!   (target page unreachable, invalid configuration), or a best-effort side
//!   channel failed (ledger corruption on load, notification delivery).
//!
//! * [`DocumentError`]: **Candidate-level**: a single PDF failed (download,
//!   rasterisation, recognition, artifact write) but every other candidate in
//!   the same run is unaffected. The batch coordinator logs these and moves on;
//!   they never reach the caller of [`crate::batch::BatchCoordinator::run_once`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that affect a whole batch run, or the best-effort steps around it.
#[derive(Debug, Error)]
pub enum MonitorError {
    // ── Discovery errors ──────────────────────────────────────────────────
    /// The target page could not be fetched or parsed.
    #[error("Failed to discover documents on '{url}': {reason}")]
    DiscoveryFailed { url: String, reason: String },

    /// Fetching the target page exceeded the configured timeout.
    #[error("Discovery timed out after {secs}s for '{url}'")]
    DiscoveryTimeout { url: String, secs: u64 },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// The ledger file exists but does not hold a JSON array of URLs.
    ///
    /// [`crate::ledger::Ledger::load`] recovers from this by starting empty.
    #[error("Ledger '{path}' is corrupt: {detail}")]
    LedgerCorrupt { path: PathBuf, detail: String },

    /// The ledger could not be written back to disk.
    #[error("Failed to write ledger '{path}': {source}")]
    LedgerWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Notification errors ───────────────────────────────────────────────
    /// The operator email could not be built or delivered.
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single candidate document.
///
/// Whatever step fails, the document is skipped, its ledger entry is not
/// written, and the scratch files it produced are removed.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ── Fetch ─────────────────────────────────────────────────────────────
    /// Download failed: transport error or non-success HTTP status.
    #[error("Failed to download '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    FetchTimeout { url: String, secs: u64 },

    /// The downloaded body does not start with the PDF magic bytes.
    #[error("Response from '{url}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: Vec<u8> },

    // ── Rasterisation ─────────────────────────────────────────────────────
    /// The external renderer could not be launched at all.
    #[error("Renderer '{program}' could not be started: {detail}")]
    RendererUnavailable { program: String, detail: String },

    /// The external renderer ran but reported failure.
    #[error("Rasterisation failed (exit code {code}): {detail}", code = exit_code_label(exit_code))]
    RasterisationFailed {
        exit_code: Option<i32>,
        detail: String,
    },

    /// The external renderer did not finish within the configured timeout.
    #[error("Rasterisation timed out after {secs}s")]
    RendererTimeout { secs: u64 },

    // ── Recognition ───────────────────────────────────────────────────────
    /// The recognition engine could not be brought up for this document.
    #[error("OCR engine failed to start: {0}")]
    EngineStartFailed(String),

    /// Recognition of one page failed after all retries.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// Recognition of one page exceeded the configured timeout.
    #[error("Page {page}: recognition timed out after {secs}s")]
    RecognitionTimeout { page: usize, secs: u64 },

    // ── Persistence ───────────────────────────────────────────────────────
    /// A scratch file or directory could not be created, written or listed.
    #[error("Scratch I/O failed at '{path}': {source}")]
    ScratchIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text artifact could not be durably written.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact was written but the ledger entry could not be persisted.
    #[error("Failed to record '{url}' in ledger: {source}")]
    LedgerRecordFailed {
        url: String,
        #[source]
        source: MonitorError,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none".to_string(),
    }
}

impl DocumentError {
    pub(crate) fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::ScratchIo {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterisation_display_with_exit_code() {
        let e = DocumentError::RasterisationFailed {
            exit_code: Some(99),
            detail: "Syntax Error: Couldn't find trailer dictionary".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("exit code 99"), "got: {msg}");
        assert!(msg.contains("trailer"), "got: {msg}");
    }

    #[test]
    fn rasterisation_display_killed_by_signal() {
        let e = DocumentError::RasterisationFailed {
            exit_code: None,
            detail: "terminated".into(),
        };
        assert!(e.to_string().contains("exit code none"));
    }

    #[test]
    fn recognition_timeout_display() {
        let e = DocumentError::RecognitionTimeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn ledger_record_failure_keeps_source() {
        let e = DocumentError::LedgerRecordFailed {
            url: "https://site/a.pdf".into(),
            source: MonitorError::LedgerWriteFailed {
                path: PathBuf::from("/ro/processed_pdfs.json"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        };
        assert!(e.to_string().contains("https://site/a.pdf"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn discovery_display() {
        let e = MonitorError::DiscoveryFailed {
            url: "https://www.mof.go.jp/".into(),
            reason: "HTTP 503".into(),
        };
        assert!(e.to_string().contains("HTTP 503"));
    }
}
