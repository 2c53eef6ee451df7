//! CLI binary for pricelist-monitor.
//!
//! A thin shim over the library crate that maps CLI flags to `MonitorConfig`
//! and either runs one batch (`--once`) or stays up on the daily schedule.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pricelist_monitor::{
    run_daily, BatchCoordinator, BatchProgressCallback, CandidateDocument, MonitorConfig,
    NotifyConfig, PageSeparator, ProcessedDocument,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// One bar tick per new document, with a log line per outcome.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos}/{len}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix("Ingesting");
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_document_start(&self, _index: usize, _total: usize, candidate: &CandidateDocument) {
        self.bar.set_message(candidate.title.clone());
    }

    fn on_document_complete(&self, _index: usize, _total: usize, doc: &ProcessedDocument) {
        self.bar.println(format!(
            "  {} {}  ({} pages → {})",
            green("✓"),
            doc.title,
            doc.page_count,
            doc.artifact_path.display()
        ));
        self.bar.inc(1);
    }

    fn on_document_error(
        &self,
        _index: usize,
        _total: usize,
        candidate: &CandidateDocument,
        error: &str,
    ) {
        self.bar
            .println(format!("  {} {}  {}", red("✗"), candidate.title, red(error)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} new documents ingested",
            if success_count == total { green("✔") } else { red("✘") },
            bold(&success_count.to_string()),
            total
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run once and exit (for cron / launchd / systemd timers)
  pricelist-monitor --once

  # Stay up: run now, then every day at 10:00 local time
  pricelist-monitor

  # Different trigger time and data location
  pricelist-monitor --at 07:30 --data-dir /var/lib/pricelist

  # Email the operator after each run that found something
  SMTP_USER=ops@example.com SMTP_PASS=... pricelist-monitor --smtp-host smtp.example.com

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (recognition)
  ANTHROPIC_API_KEY       Anthropic API key (recognition)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  SMTP_HOST / SMTP_PORT / SMTP_USER / SMTP_PASS / SMTP_FROM / SMTP_TO
                          Notification; disabled unless SMTP_USER and SMTP_PASS are set

REQUIREMENTS:
  pdftoppm (poppler-utils) on PATH, or --renderer /path/to/pdftoppm
"#;

/// Watch the price-list page, OCR new PDFs and keep their text.
#[derive(Parser, Debug)]
#[command(
    name = "pricelist-monitor",
    version,
    about = "Watch a page for new price-list PDFs, OCR them and keep the text",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Run a single batch and exit.
    #[arg(long)]
    once: bool,

    /// Page to scrape for PDF links.
    #[arg(long, env = "PRICELIST_TARGET_URL", default_value = pricelist_monitor::config::DEFAULT_TARGET_URL)]
    url: String,

    /// Substring a link's text must contain.
    #[arg(long, env = "PRICELIST_TITLE_PATTERN", default_value = pricelist_monitor::config::DEFAULT_TITLE_PATTERN)]
    pattern: String,

    /// Directory for extracted text files.
    #[arg(long, env = "PRICELIST_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Ledger of processed PDF URLs.
    #[arg(long, env = "PRICELIST_LEDGER", default_value = "processed_pdfs.json")]
    ledger: PathBuf,

    /// Scratch directory for downloaded PDFs and page images.
    #[arg(long, env = "PRICELIST_SCRATCH_DIR", default_value = "temp")]
    scratch_dir: PathBuf,

    /// Renderer executable.
    #[arg(long, env = "PRICELIST_RENDERER", default_value = "pdftoppm")]
    renderer: String,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PRICELIST_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Scale pages so the longest edge is this many pixels (overrides --dpi).
    #[arg(long, env = "PRICELIST_MAX_PIXELS")]
    max_pixels: Option<u32>,

    /// OCR language code (jpn, eng, ...).
    #[arg(long, env = "PRICELIST_LANGUAGE", default_value = "jpn")]
    language: String,

    /// Page separator: blank, formfeed, or a custom string.
    #[arg(long, env = "PRICELIST_SEPARATOR", default_value = "blank")]
    separator: String,

    /// Vision model ID used for recognition.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Vision provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Retries per page on recognition failure (0-10).
    #[arg(long, env = "PRICELIST_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Page and PDF download timeout in seconds.
    #[arg(long, env = "PRICELIST_FETCH_TIMEOUT", default_value_t = 120)]
    fetch_timeout: u64,

    /// Renderer timeout in seconds.
    #[arg(long, env = "PRICELIST_RENDERER_TIMEOUT", default_value_t = 300)]
    renderer_timeout: u64,

    /// Per-page recognition timeout in seconds.
    #[arg(long, env = "PRICELIST_RECOGNITION_TIMEOUT", default_value_t = 120)]
    recognition_timeout: u64,

    /// Daily run time, local (HH:MM).
    #[arg(long, env = "PRICELIST_AT", default_value = "10:00", value_parser = parse_time)]
    at: NaiveTime,

    /// SMTP relay host.
    #[arg(long, env = "SMTP_HOST")]
    smtp_host: Option<String>,

    /// SMTP port (465 = implicit TLS, otherwise STARTTLS).
    #[arg(long, env = "SMTP_PORT")]
    smtp_port: Option<u16>,

    /// SMTP username.
    #[arg(long, env = "SMTP_USER")]
    smtp_user: Option<String>,

    /// SMTP password.
    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    smtp_pass: Option<String>,

    /// Sender address (defaults to the SMTP username).
    #[arg(long, env = "SMTP_FROM")]
    smtp_from: Option<String>,

    /// Recipient address (defaults to the sender).
    #[arg(long, env = "SMTP_TO")]
    smtp_to: Option<String>,

    /// Disable the progress bar in one-shot mode.
    #[arg(long, env = "PRICELIST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PRICELIST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PRICELIST_QUIET")]
    quiet: bool,
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

fn parse_separator(s: &str) -> PageSeparator {
    match s {
        "blank" => PageSeparator::BlankLine,
        "formfeed" => PageSeparator::FormFeed,
        other => PageSeparator::Custom(other.to_string()),
    }
}

fn build_config(cli: &Cli) -> Result<MonitorConfig> {
    let notify = NotifyConfig {
        host: cli.smtp_host.clone(),
        port: cli.smtp_port,
        username: cli.smtp_user.clone(),
        password: cli.smtp_pass.clone(),
        from: cli.smtp_from.clone(),
        recipient: cli.smtp_to.clone(),
    };

    let mut builder = MonitorConfig::builder()
        .target_url(&cli.url)
        .title_pattern(&cli.pattern)
        .data_dir(&cli.data_dir)
        .ledger_path(&cli.ledger)
        .scratch_dir(&cli.scratch_dir)
        .renderer_program(&cli.renderer)
        .dpi(cli.dpi)
        .language(&cli.language)
        .page_separator(parse_separator(&cli.separator))
        .max_retries(cli.max_retries)
        .fetch_timeout_secs(cli.fetch_timeout)
        .renderer_timeout_secs(cli.renderer_timeout)
        .recognition_timeout_secs(cli.recognition_timeout)
        .daily_at(cli.at)
        .notify(notify);

    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }

    builder.build().context("Invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let mut coordinator = BatchCoordinator::from_config(&config)
        .await
        .context("Failed to start monitor")?;

    if !cli.once {
        run_daily(coordinator, config.daily_at).await;
        return Ok(());
    }

    info!("Running in single-run mode...");
    if !cli.quiet && !cli.no_progress {
        coordinator = coordinator.with_progress(CliProgressCallback::new());
    }
    match coordinator.run_once().await {
        Ok(output) => {
            if !output.report.notified && output.report.processed > 0 {
                info!("Operator was not notified");
            }
        }
        Err(e) => error!("Run failed: {}", e),
    }
    info!("Single run completed.");
    Ok(())
}
