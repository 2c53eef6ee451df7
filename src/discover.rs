//! Discovery: find price-list PDF links on the target page.
//!
//! The page is small, static HTML, so anchors are pulled out with a regex
//! rather than a DOM parser. A link is a candidate when its href ends in
//! `.pdf` and its visible text contains the title pattern.

use crate::error::{DocumentError, MonitorError};
use crate::output::CandidateDocument;
use crate::pipeline::fetch::Fetcher;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of candidate documents for a batch run.
#[async_trait]
pub trait Discoverer: Send + Sync {
    /// List candidates in page order. A failure aborts the run.
    async fn discover(&self) -> Result<Vec<CandidateDocument>, MonitorError>;
}

/// [`Discoverer`] that scrapes one HTML page.
pub struct PageScraper {
    fetcher: Arc<dyn Fetcher>,
    target_url: String,
    title_pattern: String,
}

impl PageScraper {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        target_url: impl Into<String>,
        title_pattern: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            target_url: target_url.into(),
            title_pattern: title_pattern.into(),
        }
    }
}

#[async_trait]
impl Discoverer for PageScraper {
    async fn discover(&self) -> Result<Vec<CandidateDocument>, MonitorError> {
        let base = Url::parse(&self.target_url).map_err(|e| MonitorError::DiscoveryFailed {
            url: self.target_url.clone(),
            reason: format!("invalid target URL: {e}"),
        })?;

        let body = self
            .fetcher
            .fetch_binary(&self.target_url)
            .await
            .map_err(|e| match e {
                DocumentError::FetchTimeout { url, secs } => {
                    MonitorError::DiscoveryTimeout { url, secs }
                }
                other => MonitorError::DiscoveryFailed {
                    url: self.target_url.clone(),
                    reason: other.to_string(),
                },
            })?;

        let html = String::from_utf8_lossy(&body);
        let candidates = extract_candidates(&html, &base, &self.title_pattern);
        info!(
            "Discovered {} candidate PDFs on {}",
            candidates.len(),
            self.target_url
        );
        Ok(candidates)
    }
}

// ── HTML extraction ──────────────────────────────────────────────────────

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extract candidate links from `html`.
///
/// Relative hrefs are resolved against `base`. Links are de-duplicated by
/// resolved URL, keeping the first occurrence and page order.
pub fn extract_candidates(html: &str, base: &Url, pattern: &str) -> Vec<CandidateDocument> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for caps in RE_ANCHOR.captures_iter(html) {
        let href = decode_entities(caps[1].trim());
        let title = visible_text(&caps[2]);

        if !is_pdf_link(&href) || !title.contains(pattern) {
            continue;
        }

        let url = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                debug!("Skipping unresolvable href '{}': {}", href, e);
                continue;
            }
        };

        if seen.insert(url.clone()) {
            out.push(CandidateDocument::new(url, title));
        }
    }

    out
}

/// Whether the href's path ends in `.pdf`, ignoring case, query and fragment.
fn is_pdf_link(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Anchor body with tags removed, entities decoded and whitespace collapsed.
fn visible_text(inner_html: &str) -> String {
    let stripped = RE_TAG.replace_all(inner_html, "");
    let decoded = decode_entities(&stripped);
    RE_WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
