//! Image encoding: rendered page file → base64 payload wrapped in `ImageData`.
//!
//! Vision APIs take images as base64 data embedded in the JSON request body.
//! The renderer already wrote lossless PNG, so the bytes are forwarded as-is.

use crate::error::DocumentError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Read a rendered page from disk and encode it for the vision API.
pub async fn encode_page_file(path: &Path) -> Result<ImageData, DocumentError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocumentError::scratch(path, e))?;
    Ok(encode_image_bytes(&bytes, mime_for(path)))
}

/// Base64-wrap raw image bytes.
///
/// `detail: "high"` keeps the full tile budget; dense price tables are
/// unreadable at the single low-detail tile.
pub fn encode_image_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn encode_bytes_round_trips_through_base64() {
        let data = encode_image_bytes(PNG_SIGNATURE, "image/png");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, PNG_SIGNATURE);
    }

    #[tokio::test]
    async fn encode_file_uses_extension_for_mime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page-1.JPG");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();
        let data = encode_page_file(&path).await.unwrap();
        assert_eq!(data.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_is_scratch_error() {
        let dir = TempDir::new().unwrap();
        let err = encode_page_file(&dir.path().join("page-1.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::ScratchIo { .. }));
    }
}
