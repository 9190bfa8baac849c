//! Format-specific text extraction keyed on the uploaded MIME type

use crate::error::{Error, Result};

use super::pdf::extract_pdf_pages;

const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_DOC: &str = "application/msword";

/// File formats the extractor understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Unsupported,
}

impl FileKind {
    /// Resolve the job's MIME type, falling back to an extension guess when the
    /// upload reported a generic type.
    pub fn from_mime(file_type: &str, file_name: &str) -> Self {
        match Self::from_essence(file_type.trim()) {
            Some(kind) => kind,
            None if file_type.trim().is_empty() || file_type == "application/octet-stream" => {
                mime_guess::from_path(file_name)
                    .first()
                    .and_then(|guess| Self::from_essence(guess.essence_str()))
                    .unwrap_or(Self::Unsupported)
            }
            None => Self::Unsupported,
        }
    }

    fn from_essence(essence: &str) -> Option<Self> {
        match essence {
            MIME_PDF => Some(Self::Pdf),
            MIME_DOCX | MIME_DOC => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Text of a single page, 1-indexed
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// Result of extraction
#[derive(Debug, Clone)]
pub enum ExtractedContent {
    /// Page-aware text (PDF); empty pages stay listed so numbering holds
    Paginated(Vec<PageText>),
    /// Single document-level string (DOCX/DOC, no page concept)
    Plain(String),
    /// Deliberate no-op: the type is not an error, just not extractable here
    Unsupported { file_type: String },
}

impl ExtractedContent {
    /// True when no page or body carries any non-whitespace text
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Paginated(pages) => pages.iter().all(|p| p.text.trim().is_empty()),
            Self::Plain(text) => text.trim().is_empty(),
            Self::Unsupported { .. } => true,
        }
    }
}

/// Format-specific raw-text producer
pub struct TextExtractor;

impl TextExtractor {
    /// Extract text from raw bytes according to the declared file type.
    ///
    /// Parse failures are fatal for the document and surface as errors; an
    /// unsupported type is signalled, not raised.
    pub fn extract(data: &[u8], file_type: &str, file_name: &str) -> Result<ExtractedContent> {
        match FileKind::from_mime(file_type, file_name) {
            FileKind::Pdf => Ok(ExtractedContent::Paginated(extract_pdf_pages(
                data, file_name,
            )?)),
            FileKind::Docx => Ok(ExtractedContent::Plain(extract_docx_text(
                data, file_name,
            )?)),
            FileKind::Unsupported => Ok(ExtractedContent::Unsupported {
                file_type: file_type.to_string(),
            }),
        }
    }
}

/// Extract a DOCX body as one document-level string, one line per paragraph
fn extract_docx_text(data: &[u8], file_name: &str) -> Result<String> {
    let doc = docx_rs::read_docx(data)
        .map_err(|e| Error::extract(file_name, e.to_string()))?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(text) = child {
                            content.push_str(&text.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_dispatch_covers_the_supported_set() {
        assert_eq!(FileKind::from_mime(MIME_PDF, "a.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime(MIME_DOCX, "a.docx"), FileKind::Docx);
        assert_eq!(FileKind::from_mime(MIME_DOC, "a.doc"), FileKind::Docx);
        assert_eq!(
            FileKind::from_mime("text/plain", "notes.txt"),
            FileKind::Unsupported
        );
        assert_eq!(
            FileKind::from_mime("image/png", "scan.png"),
            FileKind::Unsupported
        );
    }

    #[test]
    fn generic_mime_falls_back_to_the_extension() {
        assert_eq!(
            FileKind::from_mime("application/octet-stream", "report.pdf"),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::from_mime("", "contract.docx"),
            FileKind::Docx
        );
        assert_eq!(
            FileKind::from_mime("application/octet-stream", "mystery.bin"),
            FileKind::Unsupported
        );
    }

    #[test]
    fn unsupported_type_is_signalled_not_raised() {
        let result = TextExtractor::extract(b"GIF89a", "image/gif", "anim.gif")
            .expect("no error for unsupported");
        assert!(matches!(result, ExtractedContent::Unsupported { .. }));
        assert!(result.is_empty());
    }

    #[test]
    fn emptiness_checks_cover_both_shapes() {
        let empty_pages = ExtractedContent::Paginated(vec![
            PageText { page_number: 1, text: "   ".into() },
            PageText { page_number: 2, text: String::new() },
        ]);
        assert!(empty_pages.is_empty());

        let with_text = ExtractedContent::Paginated(vec![PageText {
            page_number: 1,
            text: "body".into(),
        }]);
        assert!(!with_text.is_empty());

        assert!(ExtractedContent::Plain("  \n ".into()).is_empty());
        assert!(!ExtractedContent::Plain("word".into()).is_empty());
    }

    #[test]
    fn docx_round_trip_extracts_paragraph_text() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buffer = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("The vendor encrypts data at rest.")),
            )
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Backups run nightly.")),
            )
            .build()
            .pack(&mut buffer)
            .expect("docx builds");

        let extracted = TextExtractor::extract(
            buffer.get_ref(),
            MIME_DOCX,
            "policy.docx",
        )
        .expect("extracts");

        match extracted {
            ExtractedContent::Plain(text) => {
                assert!(text.contains("The vendor encrypts data at rest."));
                assert!(text.contains("Backups run nightly."));
            }
            other => panic!("expected plain text, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_docx_is_a_fatal_extract_error() {
        let err = TextExtractor::extract(b"not a zip archive", MIME_DOCX, "broken.docx")
            .expect_err("must fail");
        assert!(matches!(err, Error::Extract { .. }));
    }
}
