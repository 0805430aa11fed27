//! Text extraction from uploaded document bytes

use crate::error::{Error, Result};

/// Text extracted from a document, one entry per page
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Ordered page texts, empty pages dropped
    pub pages: Vec<String>,
    /// Total pages in the source document
    pub page_count: u32,
}

/// Turns document bytes into an ordered sequence of page texts
pub trait TextExtractor: Send + Sync {
    fn extract(&self, name: &str, data: &[u8]) -> Result<ExtractedText>;
}

/// Extension-dispatching extractor covering the supported upload types
pub struct DocumentExtractor {
    pdf: PdfExtractor,
    text: PlainTextExtractor,
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self {
            pdf: PdfExtractor,
            text: PlainTextExtractor,
        }
    }

    /// Whether this file name has a supported extension
    pub fn supports(name: &str) -> bool {
        matches!(extension_of(name).as_str(), "pdf" | "txt" | "md")
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, name: &str, data: &[u8]) -> Result<ExtractedText> {
        match extension_of(name).as_str() {
            "pdf" => self.pdf.extract(name, data),
            "txt" | "md" => self.text.extract(name, data),
            other => Err(Error::UnsupportedFileType(other.to_string())),
        }
    }
}

fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or("").to_lowercase()
}

/// PDF text extraction via lopdf, page by page
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, name: &str, data: &[u8]) -> Result<ExtractedText> {
        let document = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(name, format!("Failed to load PDF: {}", e)))?;

        let page_ids = document.get_pages();
        let page_count = page_ids.len() as u32;

        let mut pages = Vec::new();
        for (page_no, _page_id) in page_ids {
            match document.extract_text(&[page_no]) {
                Ok(text) => {
                    let text = cleanup_page_text(&text);
                    if !text.is_empty() {
                        pages.push(text);
                    }
                }
                Err(e) => {
                    tracing::debug!(page = page_no, "no extractable text on page: {}", e);
                }
            }
        }

        if pages.is_empty() {
            return Err(Error::extraction(
                name,
                "PDF has no extractable text, it may be image-based or encrypted",
            ));
        }

        Ok(ExtractedText { pages, page_count })
    }
}

/// Plain text and markdown files pass through as a single page
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, name: &str, data: &[u8]) -> Result<ExtractedText> {
        let content = String::from_utf8_lossy(data).replace('\0', "");
        if content.trim().is_empty() {
            return Err(Error::extraction(name, "File contains no text"));
        }
        Ok(ExtractedText {
            pages: vec![content],
            page_count: 1,
        })
    }
}

/// Normalize extracted page text: strip nulls, collapse blank lines
fn cleanup_page_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_known_extensions() {
        assert!(DocumentExtractor::supports("report.pdf"));
        assert!(DocumentExtractor::supports("notes.TXT"));
        assert!(DocumentExtractor::supports("readme.md"));
        assert!(!DocumentExtractor::supports("deck.pptx"));
        assert!(!DocumentExtractor::supports("noextension"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let extractor = DocumentExtractor::new();
        let err = extractor.extract("img.png", b"data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn plain_text_passes_through() {
        let extractor = DocumentExtractor::new();
        let extracted = extractor.extract("notes.txt", b"line one\nline two").unwrap();
        assert_eq!(extracted.pages, vec!["line one\nline two".to_string()]);
        assert_eq!(extracted.page_count, 1);
    }

    #[test]
    fn empty_text_file_is_an_error() {
        let extractor = DocumentExtractor::new();
        let err = extractor.extract("empty.txt", b"   \n  ").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn invalid_pdf_is_an_extraction_error() {
        let extractor = DocumentExtractor::new();
        let err = extractor.extract("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn cleanup_collapses_blank_lines() {
        let cleaned = cleanup_page_text("a  \n\n\n b\0c\n");
        assert_eq!(cleaned, "a\n bc");
    }
}
