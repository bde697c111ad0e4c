//! Digital-PDF text extraction via `pdf-extract`.

use doc_intake_core::models::ExtractionResult;

use crate::error::ExtractError;

pub const MODE_PDF_TEXT: &str = "pdf_text";

/// Per-page text, non-empty pages joined by a blank line.
///
/// `pages` is the page count of the document even when every page is
/// empty, so callers can report the size of a scanned PDF.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<ExtractionResult, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_count = pages.len();
    let text = join_pages(&pages);
    Ok(ExtractionResult::new(text, page_count, Vec::new(), MODE_PDF_TEXT))
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pdf_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn blank_pages_are_skipped_when_joining() {
        let pages = vec![
            " first page \n".to_string(),
            "\n\n".to_string(),
            "third".to_string(),
        ];
        assert_eq!(join_pages(&pages), "first page\n\nthird");
        assert_eq!(join_pages(&[]), "");
    }
}
