//! Data types flowing through a batch run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A PDF link found on the target page, not yet known to be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Absolute URL; the document's identity in the ledger.
    pub url: String,
    /// Visible link text, used to name the artifact.
    pub title: String,
}

impl CandidateDocument {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// A document whose text has been extracted and durably written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub url: String,
    pub title: String,
    /// Page texts joined in page order, each followed by the page separator.
    pub content: String,
    /// Where the artifact was written.
    pub artifact_path: PathBuf,
    /// Number of pages recognised.
    pub page_count: usize,
}

/// Statistics for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Candidates returned by discovery.
    pub discovered: usize,
    /// Candidates skipped because the ledger already lists them.
    pub already_processed: usize,
    /// Candidates ingested and ledgered in this run.
    pub processed: usize,
    /// Candidates that failed and were skipped.
    pub failed: usize,
    /// Whether the notification was delivered.
    pub notified: bool,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

/// Outcome of [`crate::batch::BatchCoordinator::run_once`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutput {
    pub report: RunReport,
    /// Successfully processed documents, in candidate order.
    pub documents: Vec<ProcessedDocument>,
}
