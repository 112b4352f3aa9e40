//! Per-page text extraction from PDF files.

use std::path::Path;

use pdf_oxide::PdfDocument;

use crate::error::{Error, Result};

/// Outcome of extracting a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageText {
    Text(String),
    /// Extraction failed for this page only; callers treat it as empty.
    Failed(String),
}

impl PageText {
    /// The extracted text, or an empty string for a failed page.
    pub fn text(&self) -> &str {
        match self {
            PageText::Text(text) => text,
            PageText::Failed(_) => "",
        }
    }
}

/// Open a PDF and extract the text of every page, in page order.
///
/// Opening the document is fallible as a whole. Individual page failures
/// are returned as [`PageText::Failed`] so one bad page does not lose the
/// rest of the file.
pub fn read_pages(path: &Path) -> Result<Vec<PageText>> {
    let pdf_error = |e: &dyn std::fmt::Display| Error::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let doc = PdfDocument::open(path).map_err(|e| pdf_error(&e))?;
    let page_count = doc.page_count().map_err(|e| pdf_error(&e))?;

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let page = match doc.extract_text(index) {
            Ok(text) => PageText::Text(text),
            Err(e) => PageText::Failed(e.to_string()),
        };
        pages.push(page);
    }

    Ok(pages)
}
