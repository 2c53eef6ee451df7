//! Configuration types for the price-list monitor.
//!
//! Every knob of a batch run lives in [`MonitorConfig`], built via its
//! [`MonitorConfigBuilder`]. Timeouts for the three external calls (page
//! fetch, renderer subprocess, recognition request) are configuration values
//! with defaults, never hard-coded waits.

use crate::error::MonitorError;
use chrono::NaiveTime;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Page that lists the retail price PDFs.
pub const DEFAULT_TARGET_URL: &str = "https://www.mof.go.jp/policy/tab_salt/topics/kouriteika.html";

/// Substring a link's visible text must contain to be a candidate.
pub const DEFAULT_TITLE_PATTERN: &str = "製造たばこ小売定価";

/// Upper bound for [`MonitorConfigBuilder::max_retries`].
pub const MAX_RETRIES: u32 = 10;

/// Configuration for the monitor.
///
/// Built via [`MonitorConfig::builder()`] or using [`MonitorConfig::default()`].
///
/// # Example
/// ```rust
/// use pricelist_monitor::MonitorConfig;
///
/// let config = MonitorConfig::builder()
///     .data_dir("./data")
///     .dpi(200)
///     .language("jpn")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MonitorConfig {
    // ── Discovery ─────────────────────────────────────────────────────────
    /// Page scraped for PDF links.
    pub target_url: String,

    /// Substring the anchor text must contain.
    pub title_pattern: String,

    // ── Persisted state ───────────────────────────────────────────────────
    /// Directory holding one `.txt` artifact per processed document.
    pub data_dir: PathBuf,

    /// JSON file listing already-processed document URLs.
    pub ledger_path: PathBuf,

    /// Directory for transient PDFs and page images. Emptied after every document.
    pub scratch_dir: PathBuf,

    // ── Rasterisation ─────────────────────────────────────────────────────
    /// External renderer executable. Default: `pdftoppm`.
    pub renderer_program: String,

    /// Rendering DPI passed to the renderer. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest rendered edge in pixels. When set, the renderer scales to fit
    /// and `dpi` no longer applies. Default: `None`.
    pub max_rendered_pixels: Option<u32>,

    // ── Recognition ───────────────────────────────────────────────────────
    /// Tesseract-style language code the engine transcribes. Default: `jpn`.
    pub language: String,

    /// Separator inserted after each page's text.
    pub page_separator: PageSeparator,

    /// Vision model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0; transcription should be deterministic.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries per page on a transient recognition failure. Range: 0–10.
    /// Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    // ── Timeouts ──────────────────────────────────────────────────────────
    /// Page and PDF download timeout in seconds. Default: 120.
    pub fetch_timeout_secs: u64,

    /// Renderer subprocess timeout in seconds. Default: 300.
    pub renderer_timeout_secs: u64,

    /// Per-page recognition timeout in seconds. Default: 120.
    pub recognition_timeout_secs: u64,

    // ── Scheduling / notification ─────────────────────────────────────────
    /// Local wall-clock time of the daily run. Default: 10:00.
    pub daily_at: NaiveTime,

    /// SMTP settings for the operator email.
    pub notify: NotifyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            title_pattern: DEFAULT_TITLE_PATTERN.to_string(),
            data_dir: PathBuf::from("data"),
            ledger_path: PathBuf::from("processed_pdfs.json"),
            scratch_dir: PathBuf::from("temp"),
            renderer_program: "pdftoppm".to_string(),
            dpi: 150,
            max_rendered_pixels: None,
            language: "jpn".to_string(),
            page_separator: PageSeparator::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            fetch_timeout_secs: 120,
            renderer_timeout_secs: 300,
            recognition_timeout_secs: 120,
            daily_at: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("target_url", &self.target_url)
            .field("title_pattern", &self.title_pattern)
            .field("data_dir", &self.data_dir)
            .field("ledger_path", &self.ledger_path)
            .field("scratch_dir", &self.scratch_dir)
            .field("renderer_program", &self.renderer_program)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("language", &self.language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("daily_at", &self.daily_at)
            .field("notify", &self.notify)
            .finish()
    }
}

impl MonitorConfig {
    /// Create a new builder for `MonitorConfig`.
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`MonitorConfig`].
#[derive(Debug)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    pub fn target_url(mut self, url: impl Into<String>) -> Self {
        self.config.target_url = url.into();
        self
    }

    pub fn title_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.title_pattern = pattern.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ledger_path = path.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn renderer_program(mut self, program: impl Into<String>) -> Self {
        self.config.renderer_program = program.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = Some(px.max(100));
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn renderer_timeout_secs(mut self, secs: u64) -> Self {
        self.config.renderer_timeout_secs = secs;
        self
    }

    pub fn recognition_timeout_secs(mut self, secs: u64) -> Self {
        self.config.recognition_timeout_secs = secs;
        self
    }

    pub fn daily_at(mut self, at: NaiveTime) -> Self {
        self.config.daily_at = at;
        self
    }

    pub fn notify(mut self, notify: NotifyConfig) -> Self {
        self.config.notify = notify;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MonitorConfig, MonitorError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(MonitorError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.title_pattern.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "Title pattern must not be empty".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if reqwest::Url::parse(&c.target_url).is_err() {
            return Err(MonitorError::InvalidConfig(format!(
                "Target URL '{}' is not an absolute URL",
                c.target_url
            )));
        }
        if c.fetch_timeout_secs == 0
            || c.renderer_timeout_secs == 0
            || c.recognition_timeout_secs == 0
        {
            return Err(MonitorError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Notification ─────────────────────────────────────────────────────────

/// SMTP options for the operator email.
///
/// Notification is a no-op unless both `username` and `password` are set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address. Falls back to `username`.
    pub from: Option<String>,
    pub recipient: Option<String>,
}

impl NotifyConfig {
    /// Default submission port (STARTTLS).
    pub const DEFAULT_PORT: u16 = 587;

    /// Whether credentials are present.
    pub fn is_enabled(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What follows each page's text in the assembled artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// A blank line after every page. (default)
    #[default]
    BlankLine,
    /// A form feed, as Tesseract emits between pages.
    FormFeed,
    /// Custom string on its own line after every page.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string placed after a page.
    pub fn render(&self) -> String {
        match self {
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::FormFeed => "\n\u{000C}".to_string(),
            PageSeparator::Custom(s) => format!("\n{}\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_monitored_site() {
        let c = MonitorConfig::default();
        assert_eq!(c.target_url, DEFAULT_TARGET_URL);
        assert_eq!(c.title_pattern, DEFAULT_TITLE_PATTERN);
        assert_eq!(c.language, "jpn");
        assert_eq!(c.ledger_path, PathBuf::from("processed_pdfs.json"));
        assert_eq!(c.daily_at, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = MonitorConfig::builder().dpi(1000).build().unwrap();
        assert_eq!(c.dpi, 400);
        let c = MonitorConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn scale_to_is_opt_in() {
        assert_eq!(MonitorConfig::default().max_rendered_pixels, None);
        let c = MonitorConfig::builder().max_rendered_pixels(50).build().unwrap();
        assert_eq!(c.max_rendered_pixels, Some(100));
    }

    #[test]
    fn builder_caps_retries() {
        let c = MonitorConfig::builder().max_retries(30).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES);
        let c = MonitorConfig::builder().max_retries(0).build().unwrap();
        assert_eq!(c.max_retries, 0);
    }

    #[test]
    fn builder_rejects_relative_target() {
        let err = MonitorConfig::builder()
            .target_url("topics/kouriteika.html")
            .build()
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeouts() {
        let err = MonitorConfig::builder()
            .renderer_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Timeouts"));
    }

    #[test]
    fn notify_requires_both_credentials() {
        let mut n = NotifyConfig::default();
        assert!(!n.is_enabled());
        n.username = Some("ops@example.com".into());
        assert!(!n.is_enabled());
        n.password = Some(String::new());
        assert!(!n.is_enabled());
        n.password = Some("hunter2".into());
        assert!(n.is_enabled());
    }

    #[test]
    fn notify_debug_redacts_password() {
        let n = NotifyConfig {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{n:?}").contains("hunter2"));
    }

    #[test]
    fn page_separator_render() {
        assert_eq!(PageSeparator::BlankLine.render(), "\n\n");
        assert_eq!(PageSeparator::Custom("----".into()).render(), "\n----\n");
    }
}
