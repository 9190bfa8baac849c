//! Boundary-aware text chunking with page-aware indexing

use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, IngestJob};

use super::extractor::ExtractedContent;

/// Character-count chunker with overlap.
///
/// Cuts prefer, in order, a paragraph break, a sentence boundary, a word
/// break, and only then a hard cut. Deterministic for a given input and
/// parameters; whitespace-only pieces are discarded.
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            // An overlap as large as the window would stall the scan
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into overlapping segments of at most `chunk_size` characters
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let remaining = chars.len() - start;
            if remaining <= self.chunk_size {
                push_piece(&mut chunks, &chars[start..]);
                break;
            }

            let window: String = chars[start..start + self.chunk_size].iter().collect();
            let cut = boundary_cut(&window).unwrap_or(self.chunk_size);
            push_piece(&mut chunks, &chars[start..start + cut]);

            let next = if cut > self.overlap {
                start + cut - self.overlap
            } else {
                start + cut
            };
            start = next.max(start + 1);
        }

        chunks
    }

    /// Chunk extracted content into index-ready points.
    ///
    /// Paginated input is split once per page: each chunk keeps its 1-indexed
    /// source page and a 0-indexed position local to that page. Non-paginated
    /// input carries a single document-wide index. Pages with no extractable
    /// text are skipped.
    pub fn chunk_document(&self, job: &IngestJob, content: &ExtractedContent) -> Vec<Chunk> {
        match content {
            ExtractedContent::Paginated(pages) => {
                let mut chunks = Vec::new();
                for page in pages {
                    if page.text.trim().is_empty() {
                        continue;
                    }
                    for (index, text) in self.split(&page.text).into_iter().enumerate() {
                        chunks.push(self.make_chunk(job, text, Some(page.page_number), index as u32));
                    }
                }
                chunks
            }
            ExtractedContent::Plain(text) => self
                .split(text)
                .into_iter()
                .enumerate()
                .map(|(index, text)| self.make_chunk(job, text, None, index as u32))
                .collect(),
            ExtractedContent::Unsupported { .. } => Vec::new(),
        }
    }

    fn make_chunk(
        &self,
        job: &IngestJob,
        text: String,
        page_number: Option<u32>,
        chunk_index: u32,
    ) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            text,
            document_id: job.doc_id,
            chat_id: job.chat_id.clone(),
            blob_key: job.blob_key.clone(),
            file_name: job.file_name.clone(),
            page_number,
            chunk_index,
            embedding: Vec::new(),
        }
    }
}

fn push_piece(chunks: &mut Vec<String>, piece: &[char]) {
    if piece.iter().any(|c| !c.is_whitespace()) {
        chunks.push(piece.iter().collect());
    }
}

/// Preferred cut position (in characters) inside a full-size window
fn boundary_cut(window: &str) -> Option<usize> {
    // Paragraph break: cut just after it
    if let Some(byte_idx) = window.rfind("\n\n") {
        let cut = window[..byte_idx + 2].chars().count();
        if cut > 0 {
            return Some(cut);
        }
    }

    // Sentence boundary: cut at the start of the last (partial) sentence
    if let Some(byte_idx) = window
        .split_sentence_bound_indices()
        .map(|(i, _)| i)
        .filter(|i| *i > 0)
        .last()
    {
        return Some(window[..byte_idx].chars().count());
    }

    // Word break: cut just after the last whitespace
    if let Some((byte_idx, c)) = window
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .last()
    {
        let cut = window[..byte_idx + c.len_utf8()].chars().count();
        if cut > 0 {
            return Some(cut);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::extractor::PageText;

    fn job() -> IngestJob {
        IngestJob {
            doc_id: Uuid::new_v4(),
            chat_id: "chat-1".into(),
            uploaded_at: "2024-06-01T10:00:00Z".into(),
            file_name: "report.pdf".into(),
            blob_key: "chat-1/report.pdf".into(),
            file_type: "application/pdf".into(),
            review: None,
        }
    }

    fn sentences(total_chars: usize) -> String {
        let mut text = String::new();
        let mut n = 0usize;
        while text.chars().count() < total_chars {
            n += 1;
            text.push_str(&format!("This is sentence number {:04}. ", n));
        }
        text.chars().take(total_chars).collect()
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = TextChunker::new(500, 50);
        let text = sentences(2000);
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }

    #[test]
    fn twelve_hundred_chars_make_three_bounded_chunks() {
        let chunker = TextChunker::new(500, 50);
        let text = sentences(1200);
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn consecutive_chunks_share_the_overlap() {
        let chunker = TextChunker::new(500, 50);
        let text = sentences(1200);
        let chunks = chunker.split(&text);

        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .rev()
                .take(50)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(
                pair[1].starts_with(&tail),
                "chunk did not start with the previous chunk's tail"
            );
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TextChunker::new(500, 50);
        let chunks = chunker.split("A single short paragraph.");
        assert_eq!(chunks, vec!["A single short paragraph.".to_string()]);
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        let chunker = TextChunker::new(500, 50);
        assert!(chunker.split("   \n\n \t ").is_empty());
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn paragraph_breaks_are_preferred_cut_points() {
        let chunker = TextChunker::new(100, 10);
        let text = format!("{}\n\n{}", "alpha ".repeat(12).trim(), "beta ".repeat(30));
        let chunks = chunker.split(&text);
        // First chunk ends at the paragraph break, not at a mid-word hard cut
        assert!(chunks[0].ends_with("\n\n"));
        assert!(chunks[0].starts_with("alpha"));
    }

    #[test]
    fn unbroken_text_falls_back_to_hard_cuts() {
        let chunker = TextChunker::new(100, 10);
        let text = "x".repeat(250);
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 100);
        // Hard cuts still honour the overlap
        assert_eq!(chunks[1].chars().count(), 100);
    }

    #[test]
    fn paginated_chunks_keep_page_numbers_and_local_indexes() {
        let chunker = TextChunker::new(500, 50);
        let content = ExtractedContent::Paginated(vec![
            PageText {
                page_number: 1,
                text: sentences(700),
            },
            PageText {
                page_number: 2,
                text: "A brief second page.".into(),
            },
        ]);

        let chunks = chunker.chunk_document(&job(), &content);
        let pages: std::collections::BTreeSet<u32> =
            chunks.iter().filter_map(|c| c.page_number).collect();
        assert_eq!(pages, [1u32, 2u32].into_iter().collect());

        // Indexes restart on every page
        let page_two: Vec<_> = chunks.iter().filter(|c| c.page_number == Some(2)).collect();
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].chunk_index, 0);

        let page_one_indexes: Vec<u32> = chunks
            .iter()
            .filter(|c| c.page_number == Some(1))
            .map(|c| c.chunk_index)
            .collect();
        assert_eq!(page_one_indexes, (0..page_one_indexes.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn empty_pages_are_skipped_without_renumbering() {
        let chunker = TextChunker::new(500, 50);
        let content = ExtractedContent::Paginated(vec![
            PageText {
                page_number: 1,
                text: "Text on page one.".into(),
            },
            PageText {
                page_number: 2,
                text: "   ".into(),
            },
            PageText {
                page_number: 3,
                text: "Text on page three.".into(),
            },
        ]);

        let chunks = chunker.chunk_document(&job(), &content);
        let pages: Vec<u32> = chunks.iter().filter_map(|c| c.page_number).collect();
        assert_eq!(pages, vec![1, 3]);
    }

    #[test]
    fn plain_content_uses_a_document_wide_index() {
        let chunker = TextChunker::new(500, 50);
        let content = ExtractedContent::Plain(sentences(1200));
        let chunks = chunker.chunk_document(&job(), &content);

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.page_number, None);
        }
    }

    #[test]
    fn every_chunk_carries_its_provenance() {
        let chunker = TextChunker::new(500, 50);
        let job = job();
        let content = ExtractedContent::Plain("Some content worth indexing.".into());
        let chunks = chunker.chunk_document(&job, &content);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, job.doc_id);
        assert_eq!(chunks[0].chat_id, job.chat_id);
        assert_eq!(chunks[0].blob_key, job.blob_key);
        assert!(chunks[0].embedding.is_empty());
    }
}
