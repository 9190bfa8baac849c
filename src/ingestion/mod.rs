//! Document ingestion: format-specific extraction and chunking

mod chunker;
mod extractor;
mod pdf;

pub use chunker::TextChunker;
pub use extractor::{ExtractedContent, FileKind, PageText, TextExtractor};
pub use pdf::extract_pdf_pages;
