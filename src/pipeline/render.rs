//! PDF rasterisation: render every page to a numbered PNG via an external
//! renderer.
//!
//! The production [`PdftoppmRasterizer`] shells out to poppler's `pdftoppm`,
//! which writes `<prefix>-<N>.png` per page. `N` is zero-padded to the width
//! of the page count, so `page-2.png` and `page-10.png` can both appear and a
//! lexical sort would put page 10 first. [`collect_page_images`] therefore
//! orders by the parsed page number, never by name or creation time.

use crate::config::MonitorConfig;
use crate::error::DocumentError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// File-name prefix for rendered pages inside a scratch directory.
pub const PAGE_IMAGE_PREFIX: &str = "page";

/// One rendered page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub path: PathBuf,
}

/// Converts a PDF file into page images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `pdf_path` into `out_dir` and return the pages in ascending
    /// page order. The caller owns `out_dir` and its cleanup.
    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path)
        -> Result<Vec<PageImage>, DocumentError>;
}

/// [`Rasterizer`] backed by the `pdftoppm` executable.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
    max_pixels: Option<u32>,
    timeout_secs: u64,
}

impl PdftoppmRasterizer {
    /// `max_pixels` adds `-scale-to`, which makes pdftoppm ignore `dpi`.
    pub fn new(
        program: impl Into<String>,
        dpi: u32,
        max_pixels: Option<u32>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            program: program.into(),
            dpi,
            max_pixels,
            timeout_secs,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.renderer_program.clone(),
            config.dpi,
            config.max_rendered_pixels,
            config.renderer_timeout_secs,
        )
    }

    fn render_args(&self, pdf_path: &Path, prefix: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-png".into(), "-r".into(), self.dpi.to_string().into()];
        if let Some(px) = self.max_pixels {
            args.push("-scale-to".into());
            args.push(px.to_string().into());
        }
        args.push(pdf_path.into());
        args.push(prefix.into());
        args
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PageImage>, DocumentError> {
        let prefix = out_dir.join(PAGE_IMAGE_PREFIX);

        let child = Command::new(&self.program)
            .args(self.render_args(pdf_path, &prefix))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DocumentError::RendererUnavailable {
                program: self.program.clone(),
                detail: e.to_string(),
            })?;

        // On timeout the future owning the child is dropped, which kills it.
        let output = match timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DocumentError::RasterisationFailed {
                    exit_code: None,
                    detail: format!("failed to wait for {}: {}", self.program, e),
                })
            }
            Err(_) => {
                return Err(DocumentError::RendererTimeout {
                    secs: self.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::RasterisationFailed {
                exit_code: output.status.code(),
                detail: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        let pages = collect_page_images(out_dir, PAGE_IMAGE_PREFIX).await?;
        if pages.is_empty() {
            return Err(DocumentError::RasterisationFailed {
                exit_code: output.status.code(),
                detail: format!("{} produced no page images", self.program),
            });
        }

        info!("Rasterised {} pages", pages.len());
        Ok(pages)
    }
}

/// List `<prefix>-<N>.png` files in `dir`, ordered by `N`.
///
/// Files that do not match the pattern (the source PDF, stray temp files)
/// are ignored.
pub async fn collect_page_images(
    dir: &Path,
    prefix: &str,
) -> Result<Vec<PageImage>, DocumentError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| DocumentError::scratch(dir, e))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DocumentError::scratch(dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(page_num) = parse_page_number(name, prefix) {
            pages.push(PageImage {
                page_num,
                path: entry.path(),
            });
        }
    }

    pages.sort_by_key(|p| p.page_num);
    debug!("Found {} page images in {}", pages.len(), dir.display());
    Ok(pages)
}

/// `page-007.png` → `Some(7)` for prefix `page`.
pub fn parse_page_number(file_name: &str, prefix: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_plain_and_padded_numbers() {
        assert_eq!(parse_page_number("page-1.png", "page"), Some(1));
        assert_eq!(parse_page_number("page-10.png", "page"), Some(10));
        assert_eq!(parse_page_number("page-007.png", "page"), Some(7));
    }

    #[test]
    fn rejects_foreign_files() {
        assert_eq!(parse_page_number("source.pdf", "page"), None);
        assert_eq!(parse_page_number("page-.png", "page"), None);
        assert_eq!(parse_page_number("page-1a.png", "page"), None);
        assert_eq!(parse_page_number("page-1.ppm", "page"), None);
        assert_eq!(parse_page_number("other-1.png", "page"), None);
        assert_eq!(parse_page_number("page-+1.png", "page"), None);
    }

    #[tokio::test]
    async fn orders_numerically_not_lexically() {
        let dir = TempDir::new().unwrap();
        for n in ["10", "2", "1", "11", "3"] {
            std::fs::write(dir.path().join(format!("page-{n}.png")), n).unwrap();
        }
        std::fs::write(dir.path().join("source.pdf"), "%PDF").unwrap();

        let pages = collect_page_images(dir.path(), PAGE_IMAGE_PREFIX)
            .await
            .unwrap();
        let order: Vec<usize> = pages.iter().map(|p| p.page_num).collect();
        assert_eq!(order, vec![1, 2, 3, 10, 11]);
        assert!(pages[3].path.ends_with("page-10.png"));
    }

    #[test]
    fn dpi_alone_by_default() {
        let r = PdftoppmRasterizer::from_config(&MonitorConfig::default());
        let args = r.render_args(Path::new("/s/source.pdf"), Path::new("/s/page"));
        assert_eq!(
            args,
            ["-png", "-r", "150", "/s/source.pdf", "/s/page"]
                .map(OsString::from)
                .to_vec()
        );
    }

    #[test]
    fn scale_to_only_when_configured() {
        let r = PdftoppmRasterizer::new("pdftoppm", 200, Some(2000), 5);
        let args = r.render_args(Path::new("in.pdf"), Path::new("out/page"));
        assert_eq!(
            args,
            ["-png", "-r", "200", "-scale-to", "2000", "in.pdf", "out/page"]
                .map(OsString::from)
                .to_vec()
        );
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("source.pdf");
        std::fs::write(&pdf, "%PDF-1.4").unwrap();

        let r = PdftoppmRasterizer::new("definitely-not-a-renderer-binary", 150, None, 5);
        let err = r.rasterize(&pdf, dir.path()).await.unwrap_err();
        assert!(matches!(err, DocumentError::RendererUnavailable { .. }));
    }
}
