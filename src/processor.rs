//! Document processor: one candidate in, one durable text artifact out.
//!
//! ```text
//! fetch ─▶ %PDF check ─▶ scratch dir ─▶ rasterise ─▶ OCR (one session)
//!                              │                           │
//!                              └──── removed on every ─────┘
//!                                    exit path
//!                                                  ─▶ artifact (tmp + fsync + rename)
//! ```
//!
//! The processor never touches the ledger. The batch coordinator records the
//! URL only after [`DocumentProcessor::process`] has returned, i.e. after the
//! artifact is on stable storage.

use crate::config::{MonitorConfig, PageSeparator};
use crate::error::DocumentError;
use crate::durable;
use crate::output::{CandidateDocument, ProcessedDocument};
use crate::pipeline::fetch::{self, Fetcher};
use crate::pipeline::ocr::{recognize_document, OcrEngine};
use crate::pipeline::render::Rasterizer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Prefix of per-document scratch directories.
const SCRATCH_PREFIX: &str = "doc-";

/// File name of the downloaded PDF inside a scratch directory.
const SOURCE_PDF_NAME: &str = "source.pdf";

/// Drives fetch → rasterise → recognise → persist for one candidate.
pub struct DocumentProcessor {
    fetcher: Arc<dyn Fetcher>,
    rasterizer: Arc<dyn Rasterizer>,
    engine: Arc<dyn OcrEngine>,
    data_dir: PathBuf,
    scratch_dir: PathBuf,
    page_separator: PageSeparator,
}

impl DocumentProcessor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        rasterizer: Arc<dyn Rasterizer>,
        engine: Arc<dyn OcrEngine>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            fetcher,
            rasterizer,
            engine,
            data_dir: config.data_dir.clone(),
            scratch_dir: config.scratch_dir.clone(),
            page_separator: config.page_separator.clone(),
        }
    }

    /// Ingest one candidate.
    ///
    /// On success the artifact has been flushed and renamed into place. On
    /// failure nothing was written to the data directory. In both cases the
    /// scratch files are gone when this returns.
    pub async fn process(
        &self,
        candidate: &CandidateDocument,
    ) -> Result<ProcessedDocument, DocumentError> {
        let start = Instant::now();
        info!("Processing: {} ({})", candidate.title, candidate.url);

        // ── Step 1: Fetch ────────────────────────────────────────────────────
        let bytes = self.fetcher.fetch_binary(&candidate.url).await?;
        fetch::ensure_pdf(&candidate.url, &bytes)?;

        // ── Step 2: Rasterise + recognise inside a scratch dir ───────────────
        let scratch = self.scratch_space().await?;
        let extracted = self.extract_text(&bytes, scratch.path()).await;
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch dir {}: {}", scratch_path.display(), e);
        }
        let (content, page_count) = extracted?;

        // ── Step 3: Persist the artifact ─────────────────────────────────────
        let artifact_path = write_artifact(&self.data_dir, &candidate.title, &content).await?;
        info!(
            "Saved text to: {} ({} pages, {}ms)",
            artifact_path.display(),
            page_count,
            start.elapsed().as_millis()
        );

        Ok(ProcessedDocument {
            url: candidate.url.clone(),
            title: candidate.title.clone(),
            content,
            artifact_path,
            page_count,
        })
    }

    /// Directory that will hold artifacts.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn scratch_space(&self) -> Result<TempDir, DocumentError> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| DocumentError::scratch(&self.scratch_dir, e))?;
        tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| DocumentError::scratch(&self.scratch_dir, e))
    }

    async fn extract_text(
        &self,
        bytes: &[u8],
        work_dir: &Path,
    ) -> Result<(String, usize), DocumentError> {
        let pdf_path = work_dir.join(SOURCE_PDF_NAME);
        tokio::fs::write(&pdf_path, bytes)
            .await
            .map_err(|e| DocumentError::scratch(&pdf_path, e))?;

        let pages = self.rasterizer.rasterize(&pdf_path, work_dir).await?;
        debug!("Rasterised {} pages into {}", pages.len(), work_dir.display());

        let text =
            recognize_document(self.engine.as_ref(), &pages, &self.page_separator).await?;
        Ok((text, pages.len()))
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────

static RE_RESERVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F]"#).unwrap());

/// Filesystem-safe form of a document title.
///
/// Reserved characters become `_`, then surrounding whitespace is trimmed.
/// Distinct titles can map to the same name; the later document then
/// overwrites the earlier artifact.
pub fn sanitize_title(title: &str) -> String {
    RE_RESERVED.replace_all(title, "_").trim().to_string()
}

/// `<sanitized title>.txt`, or `untitled.txt` when nothing survives.
pub fn artifact_file_name(title: &str) -> String {
    let name = sanitize_title(title);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "untitled.txt".to_string()
    } else {
        format!("{name}.txt")
    }
}

/// Write `content` durably under `data_dir`, replacing any previous artifact
/// with the same name. On `Ok` the file and its directory entry are synced.
pub async fn write_artifact(
    data_dir: &Path,
    title: &str,
    content: &str,
) -> Result<PathBuf, DocumentError> {
    let path = data_dir.join(artifact_file_name(title));
    let write_err = |source: std::io::Error| DocumentError::ArtifactWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(data_dir).await.map_err(write_err)?;
    durable::write_atomic(&path, content.as_bytes())
        .await
        .map_err(write_err)?;
    Ok(path)
}

/// Remove scratch directories left behind by a crashed run.
///
/// Only entries this crate creates (`doc-*`) are touched. Returns how many
/// were removed.
pub async fn purge_stale_scratch(scratch_dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(scratch_dir).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(SCRATCH_PREFIX) {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove stale scratch {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        info!("Removed {} stale scratch entries", removed);
    }
    removed
}
