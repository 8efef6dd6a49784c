//! Plain-text extraction from uploaded rulebooks.
//!
//! Only PDF is accepted. Extraction is CPU-bound and synchronous; callers on
//! the async runtime run it through [`tokio::task::spawn_blocking`].

use std::sync::Arc;

/// The only content type accepted for upload.
pub const MIME_PDF: &str = "application/pdf";

/// Extraction error. Extraction never panics; a failure aborts the upload.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// The extraction capability: bytes of one document in, plain text out.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ExtractError>;
}

/// [`TextExtractor`] backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
        if !is_pdf(content_type) {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// Whether a declared content type is PDF (parameters such as `; charset` ignored).
pub fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|t| t.trim().eq_ignore_ascii_case(MIME_PDF))
        .unwrap_or(false)
}

/// Run `extractor` on a blocking thread.
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    bytes: Vec<u8>,
    content_type: String,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes, &content_type))
        .await
        .unwrap_or_else(|e| Err(ExtractError::Pdf(format!("extraction task failed: {}", e))))
}
