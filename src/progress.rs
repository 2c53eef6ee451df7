//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::batch::BatchCoordinator::with_progress`] to observe a run as it
//! walks the candidate list. The CLI uses it to drive a terminal progress bar
//! in one-shot mode; the scheduled loop runs without one.
//!
//! # Example
//!
//! ```rust
//! use pricelist_monitor::{BatchProgressCallback, ProcessedDocument};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, doc: &ProcessedDocument) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({} pages)", index, total, doc.title, doc.page_count);
//!     }
//! }
//! ```

use crate::output::{CandidateDocument, ProcessedDocument};
use std::sync::Arc;

/// Called by the batch coordinator as it processes each new candidate.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once new candidates are known, before the first is processed.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a candidate is downloaded.
    fn on_document_start(&self, index: usize, total: usize, candidate: &CandidateDocument) {
        let _ = (index, total, candidate);
    }

    /// Called after a candidate's artifact and ledger entry are committed.
    fn on_document_complete(&self, index: usize, total: usize, document: &ProcessedDocument) {
        let _ = (index, total, document);
    }

    /// Called when a candidate is skipped because a step failed.
    fn on_document_error(
        &self,
        index: usize,
        total: usize,
        candidate: &CandidateDocument,
        error: &str,
    ) {
        let _ = (index, total, candidate, error);
    }

    /// Called once after every new candidate has been attempted.
    fn on_run_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type held by the coordinator.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_run_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _total: usize, _c: &CandidateDocument) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _d: &ProcessedDocument) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _i: usize, _t: usize, _c: &CandidateDocument, _e: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    fn doc(title: &str) -> ProcessedDocument {
        ProcessedDocument {
            url: format!("https://site/{title}.pdf"),
            title: title.into(),
            content: "text\n\n".into(),
            artifact_path: PathBuf::from(format!("data/{title}.txt")),
            page_count: 1,
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let c = CandidateDocument::new("https://site/a.pdf", "a");
        cb.on_run_start(2);
        cb.on_document_start(1, 2, &c);
        cb.on_document_complete(1, 2, &doc("a"));
        cb.on_document_error(2, 2, &c, "renderer exited 1");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let a = CandidateDocument::new("https://site/a.pdf", "a");
        let b = CandidateDocument::new("https://site/b.pdf", "b");

        tracker.on_run_start(2);
        tracker.on_document_start(1, 2, &a);
        tracker.on_document_complete(1, 2, &doc("a"));
        tracker.on_document_start(2, 2, &b);
        tracker.on_document_error(2, 2, &b, "download timed out");
        tracker.on_run_complete(2, 1);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 1);
    }
}
