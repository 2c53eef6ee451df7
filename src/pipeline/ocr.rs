//! OCR engine seam: one engine session per document.
//!
//! Starting an engine loads a language model, so [`recognize_document`]
//! starts exactly one [`OcrSession`] per document, feeds it every page in
//! order, and terminates it on every exit path, including a page failing
//! halfway through. Sessions are also expected to release their resources on
//! drop, which covers a panic inside a recognition call.

use crate::config::PageSeparator;
use crate::error::DocumentError;
use crate::pipeline::postprocess::clean_page_text;
use crate::pipeline::render::PageImage;
use async_trait::async_trait;
use tracing::{debug, info};

/// Factory for recognition sessions bound to one language.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Language code the engine transcribes (e.g. `jpn`).
    fn language(&self) -> &str;

    /// Bring up a session. Expensive; called once per document.
    async fn start(&self) -> Result<Box<dyn OcrSession>, DocumentError>;
}

/// A live engine instance.
#[async_trait]
pub trait OcrSession: Send {
    /// Recognise one page image into text.
    async fn recognize(&mut self, page: &PageImage) -> Result<String, DocumentError>;

    /// Release the engine. Called exactly once, after the last page.
    async fn terminate(&mut self);
}

/// Recognise every page of one document and join the results.
///
/// Each page's cleaned text is followed by `separator`, in the order of
/// `pages`, which callers supply sorted by page number. The session is
/// terminated before returning whether recognition succeeded or not.
pub async fn recognize_document(
    engine: &dyn OcrEngine,
    pages: &[PageImage],
    separator: &PageSeparator,
) -> Result<String, DocumentError> {
    let mut session = engine.start().await?;
    debug!("OCR session started ({})", engine.language());

    let result = recognize_pages(session.as_mut(), pages, separator).await;

    session.terminate().await;
    debug!("OCR session terminated");
    result
}

async fn recognize_pages(
    session: &mut dyn OcrSession,
    pages: &[PageImage],
    separator: &PageSeparator,
) -> Result<String, DocumentError> {
    let sep = separator.render();
    let mut text = String::new();

    for page in pages {
        info!("OCR processing: page {} ({})", page.page_num, page.path.display());
        let raw = session.recognize(page).await?;
        text.push_str(&clean_page_text(&raw));
        text.push_str(&sep);
    }

    Ok(text)
}
