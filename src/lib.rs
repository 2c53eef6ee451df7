//! # pricelist-monitor
//!
//! Watch a web page for newly published price-list PDFs, transcribe them and
//! keep the text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! target page
//!  │
//!  ├─ 1. Discover  scrape anchors, keep `.pdf` links whose text matches
//!  ├─ 2. Filter    drop URLs already in the ledger
//!  ├─ 3. Process   for each new PDF, one at a time:
//!  │                 fetch ─▶ pdftoppm ─▶ OCR every page (one engine session)
//!  │                 ─▶ text artifact (fsync + rename) ─▶ ledger entry
//!  └─ 4. Notify    email the operator (best-effort)
//! ```
//!
//! A URL is in the ledger only if its artifact is on disk. A crash between the
//! two steps re-processes that one document on the next run; it never loses
//! one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricelist_monitor::{BatchCoordinator, MonitorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Recognition provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = MonitorConfig::builder().data_dir("./data").build()?;
//!     let mut coordinator = BatchCoordinator::from_config(&config).await?;
//!     let output = coordinator.run_once().await?;
//!     eprintln!(
//!         "{} new, {} failed, {} already processed",
//!         output.report.processed, output.report.failed, output.report.already_processed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pricelist-monitor` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External Requirements
//!
//! Rasterisation shells out to `pdftoppm` (poppler-utils), which must be on
//! `PATH` or configured with [`MonitorConfigBuilder::renderer_program`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod discover;
pub mod durable;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod schedule;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::BatchCoordinator;
pub use config::{MonitorConfig, MonitorConfigBuilder, NotifyConfig, PageSeparator};
pub use discover::{Discoverer, PageScraper};
pub use error::{DocumentError, MonitorError};
pub use ledger::Ledger;
pub use notify::{notifier_from_config, DisabledNotifier, Notifier, SmtpNotifier};
pub use output::{CandidateDocument, ProcessedDocument, RunOutput, RunReport};
pub use pipeline::fetch::{Fetcher, HttpFetcher};
pub use pipeline::llm::VisionOcrEngine;
pub use pipeline::ocr::{OcrEngine, OcrSession};
pub use pipeline::render::{PageImage, PdftoppmRasterizer, Rasterizer};
pub use processor::DocumentProcessor;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schedule::{next_daily_run, run_daily};
