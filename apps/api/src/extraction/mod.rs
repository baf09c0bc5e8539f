//! Resume text extraction — turns uploaded PDF bytes into plain text.
//!
//! Page texts are concatenated in document order with no separator. A page
//! that yields no text contributes an empty string, so later pages are never
//! skipped. Layout and formatting are not preserved.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no document was provided")]
    Missing,

    #[error("document is not a PDF")]
    Unsupported,

    #[error("document could not be read: {0}")]
    Unreadable(String),

    #[error("no text could be extracted from the document")]
    NoText,
}

/// Extracts the full text of a PDF held in memory.
///
/// Returns `NoText` when every page is blank (e.g. scanned, image-only
/// resumes) so callers never send an empty resume to the backend.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Missing);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractionError::Unsupported);
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractionError::Unreadable("PDF parser aborted".to_string()))?
    .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    let text = join_pages(pages.into_iter().map(Some));
    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

/// Concatenates per-page text in order. `None` pages count as empty.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    pages.into_iter().map(Option::unwrap_or_default).collect()
}
