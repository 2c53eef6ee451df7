//! Pipeline stages that turn one candidate into extracted text.
//!
//! Each submodule implements exactly one step, and the three that talk to
//! the outside world sit behind a trait so the batch can be exercised with
//! in-process doubles.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ encode ──▶ ocr/llm ──▶ postprocess
//! (HTTP)   (pdftoppm)  (base64)   (engine)    (cleanup)
//! ```
//!
//! 1. [`fetch`]  : download PDF bytes ([`fetch::Fetcher`])
//! 2. [`render`] : rasterise to numbered page images ([`render::Rasterizer`])
//! 3. [`encode`] : read a page image and base64-wrap it for the vision API
//! 4. [`ocr`]    : one engine session per document ([`ocr::OcrEngine`]);
//!    [`llm`] is the production engine
//! 5. [`postprocess`] : deterministic cleanup of recognised page text

pub mod encode;
pub mod fetch;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod render;
