//! Batch coordinator: one discovery-through-notification cycle.
//!
//! ```text
//! discover ─▶ drop ledgered URLs ─▶ for each candidate, in order:
//!                                      process ─▶ artifact flushed
//!                                              ─▶ ledger.record(url)
//!                                   ─▶ notify(successes)   (best-effort)
//! ```
//!
//! Candidates are processed strictly one at a time, so at most one document
//! is ever written but not yet ledgered. Only a discovery failure ends a run
//! early; every per-document failure is logged and skipped.

use crate::config::MonitorConfig;
use crate::discover::{Discoverer, PageScraper};
use crate::error::{DocumentError, MonitorError};
use crate::ledger::Ledger;
use crate::notify::{notifier_from_config, Notifier};
use crate::output::{CandidateDocument, ProcessedDocument, RunOutput, RunReport};
use crate::pipeline::fetch::HttpFetcher;
use crate::pipeline::llm::VisionOcrEngine;
use crate::pipeline::render::PdftoppmRasterizer;
use crate::processor::{purge_stale_scratch, DocumentProcessor};
use crate::progress::ProgressCallback;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Owns the ledger and the collaborators for repeated batch runs.
pub struct BatchCoordinator {
    discoverer: Arc<dyn Discoverer>,
    processor: DocumentProcessor,
    notifier: Arc<dyn Notifier>,
    ledger: Ledger,
    progress: Option<ProgressCallback>,
}

impl BatchCoordinator {
    pub fn new(
        discoverer: Arc<dyn Discoverer>,
        processor: DocumentProcessor,
        notifier: Arc<dyn Notifier>,
        ledger: Ledger,
    ) -> Self {
        Self {
            discoverer,
            processor,
            notifier,
            ledger,
            progress: None,
        }
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// Creates the data directory, clears scratch left by a crashed run and
    /// loads the ledger (falling back to empty if it is corrupt).
    pub async fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| {
                MonitorError::Internal(format!(
                    "creating data dir {}: {e}",
                    config.data_dir.display()
                ))
            })?;
        purge_stale_scratch(&config.scratch_dir).await;

        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout_secs)?);
        let discoverer = Arc::new(PageScraper::new(
            fetcher.clone(),
            config.target_url.clone(),
            config.title_pattern.clone(),
        ));
        let processor = DocumentProcessor::new(
            fetcher,
            Arc::new(PdftoppmRasterizer::from_config(config)),
            Arc::new(VisionOcrEngine::new(config)),
            config,
        );
        let notifier = notifier_from_config(&config.notify)?;
        let ledger = Ledger::load(config.ledger_path.clone()).await;

        Ok(Self::new(discoverer, processor, notifier, ledger))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run one batch.
    ///
    /// Returns `Err` only when discovery fails. Notification failure is
    /// reported through `report.notified` instead.
    pub async fn run_once(&mut self) -> Result<RunOutput, MonitorError> {
        let start = Instant::now();
        info!("Checking for new PDFs...");

        let candidates = self.discoverer.discover().await?;
        let mut report = RunReport {
            discovered: candidates.len(),
            ..Default::default()
        };

        let fresh = self.filter_new(candidates);
        report.already_processed = report.discovered - fresh.len();

        if fresh.is_empty() {
            info!("No new PDFs found.");
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(RunOutput {
                report,
                documents: Vec::new(),
            });
        }

        info!("Found {} new PDFs.", fresh.len());
        let total = fresh.len();
        if let Some(ref cb) = self.progress {
            cb.on_run_start(total);
        }

        let mut documents = Vec::new();
        for (i, candidate) in fresh.iter().enumerate() {
            let index = i + 1;
            if let Some(ref cb) = self.progress {
                cb.on_document_start(index, total, candidate);
            }

            match self.ingest(candidate).await {
                Ok(doc) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_document_complete(index, total, &doc);
                    }
                    documents.push(doc);
                }
                Err(e) => {
                    error!(
                        url = %candidate.url,
                        title = %candidate.title,
                        "Error processing PDF: {}",
                        e
                    );
                    if let Some(ref cb) = self.progress {
                        cb.on_document_error(index, total, candidate, &e.to_string());
                    }
                    report.failed += 1;
                }
            }
        }
        report.processed = documents.len();

        if let Some(ref cb) = self.progress {
            cb.on_run_complete(total, documents.len());
        }

        if !documents.is_empty() {
            match self.notifier.notify(&documents).await {
                Ok(()) => report.notified = true,
                Err(e) => warn!("{}", e),
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Run complete: {} processed, {} failed, {} already processed ({}ms)",
            report.processed, report.failed, report.already_processed, report.duration_ms
        );
        Ok(RunOutput { report, documents })
    }

    /// Drop ledgered URLs and repeated URLs, keeping discovery order.
    fn filter_new(&self, candidates: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| !self.ledger.contains(&c.url) && seen.insert(c.url.clone()))
            .collect()
    }

    /// Process one candidate and commit its ledger entry.
    async fn ingest(
        &mut self,
        candidate: &CandidateDocument,
    ) -> Result<ProcessedDocument, DocumentError> {
        let doc = self.processor.process(candidate).await?;
        self.ledger
            .record(&candidate.url)
            .await
            .map_err(|source| DocumentError::LedgerRecordFailed {
                url: candidate.url.clone(),
                source,
            })?;
        Ok(doc)
    }
}
