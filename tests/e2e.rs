//! Live end-to-end tests against the real price-list page.
//!
//! These hit the network, run `pdftoppm` and make vision-model API calls.
//! They are gated behind the `E2E_ENABLED` environment variable so they do not
//! run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use pricelist_monitor::{
    BatchCoordinator, Discoverer, HttpFetcher, MonitorConfig, PageScraper,
};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn pdftoppm_available() -> bool {
    std::process::Command::new("pdftoppm")
        .arg("-v")
        .output()
        .is_ok()
}

// ── Discovery ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_discovery_finds_price_lists() {
    e2e_skip_unless_enabled!();

    let config = MonitorConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout_secs).unwrap());
    let scraper = PageScraper::new(fetcher, &config.target_url, &config.title_pattern);

    let candidates = scraper.discover().await.unwrap();

    assert!(!candidates.is_empty(), "no price-list PDFs on the page");
    for c in &candidates {
        assert!(c.url.starts_with("https://"), "not absolute: {}", c.url);
        assert!(c.url.to_lowercase().contains(".pdf"), "not a PDF: {}", c.url);
        assert!(c.title.contains(&config.title_pattern), "title: {}", c.title);
    }
}

// ── Full run ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_single_run() {
    e2e_skip_unless_enabled!();
    if !pdftoppm_available() {
        println!("SKIP: pdftoppm not on PATH");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config = MonitorConfig::builder()
        .data_dir(dir.path().join("data"))
        .ledger_path(dir.path().join("processed_pdfs.json"))
        .scratch_dir(dir.path().join("temp"))
        .build()
        .unwrap();

    let mut coordinator = BatchCoordinator::from_config(&config).await.unwrap();
    let output = coordinator.run_once().await.unwrap();

    println!("{:#?}", output.report);
    assert!(output.report.discovered > 0);
    assert_eq!(
        output.report.processed + output.report.failed,
        output.report.discovered - output.report.already_processed
    );
    assert_eq!(coordinator.ledger().len(), output.report.processed);
    for doc in &output.documents {
        assert!(doc.artifact_path.exists());
        assert!(!doc.content.trim().is_empty(), "empty text for {}", doc.url);
    }
    let leftovers = std::fs::read_dir(&config.scratch_dir)
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}
