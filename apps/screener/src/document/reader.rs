use std::path::Path;

use tracing::{debug, info};

use crate::document::links::extract_link_targets;
use crate::document::ResumeDocument;
use crate::errors::ExtractionError;

/// Plain-text documents separate pages with a form feed.
const PAGE_BREAK: char = '\u{000C}';

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// File suffix used when spooling an upload to temporary storage.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::PlainText => ".txt",
        }
    }
}

/// Reads a resume from disk. Fails if the file cannot be opened or has zero pages.
pub fn read_document(path: &Path) -> Result<ResumeDocument, ExtractionError> {
    let format = DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Pdf);
    let bytes = std::fs::read(path).map_err(|e| {
        ExtractionError::DocumentRead(format!("cannot open '{}': {e}", path.display()))
    })?;

    let document = match format {
        DocumentFormat::Pdf => read_pdf(&bytes)?,
        DocumentFormat::PlainText => read_plain_text(&bytes)?,
    };

    info!(
        pages = document.page_count(),
        words = document.word_count(),
        links = document.links().len(),
        "Document read"
    );
    Ok(document)
}

fn read_pdf(bytes: &[u8]) -> Result<ResumeDocument, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::DocumentRead(format!("PDF text extraction failed: {e}")))?;

    if pages.is_empty() {
        return Err(ExtractionError::DocumentRead("document has zero pages".to_string()));
    }

    // Text extraction already succeeded, so a structure the link walker cannot
    // load only costs us the links.
    let links = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => extract_link_targets(&doc),
        Err(e) => {
            debug!("Skipping link extraction: {e}");
            Vec::new()
        }
    };

    Ok(ResumeDocument::from_pages(pages, links))
}

fn read_plain_text(bytes: &[u8]) -> Result<ResumeDocument, ExtractionError> {
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return Err(ExtractionError::DocumentRead("document has zero pages".to_string()));
    }

    let pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    Ok(ResumeDocument::from_pages(pages, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("cv.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("cv.txt")),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("cv.docx")), None);
    }

    #[test]
    fn test_plain_text_pages_split_on_form_feed() {
        let file = write_temp(".txt", b"Page one text\x0cPage two text");
        let doc = read_document(file.path()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.word_count(), 6);
    }

    #[test]
    fn test_missing_file_is_document_read_error() {
        let err = read_document(Path::new("/nonexistent/resume.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentRead(_)));
    }

    #[test]
    fn test_empty_text_file_has_zero_pages() {
        let file = write_temp(".txt", b"   \n ");
        let err = read_document(file.path()).unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentRead(msg) if msg.contains("zero pages")));
    }

    #[test]
    fn test_garbage_pdf_is_document_read_error() {
        let file = write_temp(".pdf", b"this is not a pdf");
        let err = read_document(file.path()).unwrap_err();
        assert!(matches!(err, ExtractionError::DocumentRead(_)));
    }
}
