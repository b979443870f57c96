//! PDF text extraction for uploaded resumes.
//!
//! `PdfTextExtractor` is the production backend. The workflow only sees the
//! `TextExtractor` trait, so tests drive it with in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// How far into the payload the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("the uploaded file is empty")]
    Empty,

    #[error("not a readable PDF: {0}")]
    Unreadable(String),

    #[error("PDF decoder aborted: {0}")]
    DecoderAborted(String),
}

/// Converts a document payload into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError>;
}

/// Extracts text page by page with `pdf-extract`.
///
/// Decoding runs on the blocking pool. A panic inside the decoder surfaces as
/// `ExtractionError::DecoderAborted` for that document only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }
        if !has_pdf_header(&bytes) {
            return Err(ExtractionError::Unreadable(
                "missing %PDF header".to_string(),
            ));
        }

        let size = bytes.len();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| ExtractionError::DecoderAborted(e.to_string()))?
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

        debug!(bytes = size, pages = pages.len(), "PDF text extracted");
        Ok(join_pages(pages))
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

/// Concatenates per-page text in page order.
pub fn join_pages(pages: Vec<String>) -> String {
    pages.concat()
}
