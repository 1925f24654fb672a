//! Resume text extraction for PDF, DOCX and plain-text uploads.
//!
//! Callers treat a failure as "no text": the upload handler reports the error
//! and continues with an empty string.

mod docx;

use std::panic::{catch_unwind, AssertUnwindSafe};

use pdf_extract::{Document, PlainTextOutput};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Error reading PDF: {0}")]
    Pdf(String),

    #[error("Error reading DOCX: {0}")]
    Docx(String),

    #[error("Error reading text file: {0}")]
    Text(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Picks the extraction branch from an upload's MIME type.
    /// Anything that is not PDF or DOCX is read as text.
    pub fn from_mime(mime: Option<&str>) -> Self {
        let essence = mime
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase());
        match essence.as_deref() {
            Some(PDF_MIME) => DocumentFormat::Pdf,
            Some(DOCX_MIME) => DocumentFormat::Docx,
            _ => DocumentFormat::Text,
        }
    }
}

/// Extracts plain text from an uploaded document.
pub fn extract(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => docx::extract_paragraphs(bytes),
        DocumentFormat::Text => Ok(String::from_utf8(bytes.to_vec())?),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_pages(bytes)?;
    Ok(join_pages(pages.iter().map(String::as_str)))
}

/// Text of every page, in page order. Only an unreadable document is an error;
/// a page that fails to render yields an empty string.
fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let mut doc = catch_unwind(|| Document::load_mem(bytes))
        .map_err(|_| ExtractionError::Pdf("PDF parsing aborted".to_string()))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| ExtractionError::Pdf(format!("encrypted document: {e}")))?;
    }

    Ok(doc
        .get_pages()
        .into_keys()
        .map(|page_num| page_text(&doc, page_num))
        .collect())
}

fn page_text(doc: &Document, page_num: u32) -> String {
    // pdf-extract panics on some malformed pages instead of returning an error.
    let rendered = catch_unwind(AssertUnwindSafe(|| {
        let mut text = String::new();
        let result =
            pdf_extract::output_doc_page(doc, &mut PlainTextOutput::new(&mut text), page_num);
        result.map(|()| text)
    }));

    match rendered {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("Skipping PDF page {page_num}: {e}");
            String::new()
        }
        Err(_) => {
            warn!("Skipping PDF page {page_num}: text extraction aborted");
            String::new()
        }
    }
}

/// Concatenates page texts in order. A page without extractable text adds nothing.
fn join_pages<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect()
}
