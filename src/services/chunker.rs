//! Text chunking with overlap so answers split across a boundary survive.

use crate::models::{ChunkingConfig, Document, DocumentChunk};
use crate::utils::has_meaningful_content;

/// Splits document text into overlapping, bounded-size passages.
///
/// Deterministic: identical input and parameters always produce identical
/// chunk boundaries and ids, which is what makes re-ingestion idempotent.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters.
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    overlap: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Chunk a document into overlapping passages.
    ///
    /// Empty or whitespace-only input yields an empty sequence.
    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let content = &document.content;

        if content.trim().is_empty() {
            return Vec::new();
        }

        if content.chars().count() <= self.chunk_size {
            let end = content.chars().count() as u64;
            return vec![DocumentChunk::from_document(
                document,
                content.clone(),
                0,
                1,
                0,
                end,
            )];
        }

        let spans: Vec<_> = self
            .split_with_overlap(content)
            .into_iter()
            .filter(|(text, _, _)| has_meaningful_content(text))
            .collect();

        let total_chunks = spans.len() as u32;

        spans
            .into_iter()
            .enumerate()
            .map(|(idx, (text, start, end))| {
                DocumentChunk::from_document(document, text, idx as u32, total_chunks, start, end)
            })
            .collect()
    }

    /// Split content into overlapping windows with char-offset positions.
    ///
    /// The windows jointly cover every character: each window starts
    /// `overlap` characters before the previous one ended.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, u64, u64)> {
        let mut chunks = Vec::new();
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();

        let mut start = 0;
        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let adjusted_end = self.find_break_point(&chars, end, total_chars);

            let text: String = chars[start..adjusted_end].iter().collect();
            chunks.push((text, start as u64, adjusted_end as u64));

            if adjusted_end >= total_chars {
                break;
            }

            // Advance from where this chunk actually ended, not from the
            // nominal window: a break point pulled back further than the
            // overlap would otherwise leave characters no chunk covers.
            start = adjusted_end.saturating_sub(self.overlap).max(start + 1);
        }

        // A terse tail would be dropped by the substance filter; fold it into
        // the previous chunk so the final words stay retrievable.
        if chunks.len() > 1
            && !has_meaningful_content(&chunks[chunks.len() - 1].0)
            && let (Some((_, _, last_end)), Some((_, prev_start, _))) =
                (chunks.pop(), chunks.pop())
        {
            let merged: String = chars[prev_start as usize..last_end as usize].iter().collect();
            chunks.push((merged, prev_start, last_end));
        }

        chunks
    }

    /// Find a natural break point near the target end position.
    ///
    /// Priority: paragraph break > newline > sentence end > space, searched
    /// within the last fifth of the window.
    fn find_break_point(&self, chars: &[char], target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        let search_start = target_end.saturating_sub(self.chunk_size / 5);
        let search_range = &chars[search_start..target_end];

        let mut paragraph = None;
        let mut newline = None;
        let mut sentence = None;
        let mut space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range.get(i - 1) == Some(&'\n') {
                        paragraph = Some(pos + 1);
                    }
                    newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if search_range.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    space = Some(pos + 1);
                }
                _ => {}
            }
        }

        paragraph
            .or(newline)
            .or(sentence)
            .or(space)
            .unwrap_or(target_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document::new("test.pdf", content.to_string())
    }

    fn small_chunker() -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size: 80,
            chunk_overlap: 20,
            ..Default::default()
        })
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunker = TextChunker::with_defaults();
        let chunks = chunker.chunk(&doc("Refunds are issued within 30 days of purchase."));

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "Refunds are issued within 30 days of purchase."
        );
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn test_empty_and_whitespace_input_yield_nothing() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk(&doc("")).is_empty());
        assert!(chunker.chunk(&doc("   \n\t\n   ")).is_empty());
    }

    #[test]
    fn test_long_document_produces_overlapping_chunks() {
        let chunker = small_chunker();
        let sentences = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunks = chunker.chunk(&doc(&sentences));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, chunks.len() as u32);
            assert!(chunk.start_offset < chunk.end_offset);
        }
        // Consecutive windows overlap: each next chunk starts before the
        // previous one ends.
        for pair in chunks.windows(2) {
            assert!(pair[1].start_offset < pair[0].end_offset);
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = small_chunker();
        let content = "Paragraph one.\n\nParagraph two continues with more text. ".repeat(10);
        let first = chunker.chunk(&doc(&content));
        let second = chunker.chunk(&doc(&content));

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.content, b.content);
            assert_eq!(a.start_offset, b.start_offset);
            assert_eq!(a.end_offset, b.end_offset);
        }
    }

    #[test]
    fn test_no_text_lost_between_chunks() {
        // A paragraph break just past the break-search window start pulls the
        // first chunk's end back by more than the overlap; every character
        // must still land in some chunk.
        let chunker = TextChunker::with_defaults();
        let content = format!("{}\n\n{}", "a".repeat(1286), "b".repeat(2000));
        let chunks = chunker.chunk(&doc(&content));
        assert!(chunks.len() > 1);

        let total = content.chars().count();
        let mut covered = vec![false; total];
        for chunk in &chunks {
            for offset in chunk.start_offset..chunk.end_offset {
                covered[offset as usize] = true;
            }
        }
        let missing: Vec<usize> = covered
            .iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(i, _)| i)
            .collect();
        assert!(
            missing.is_empty(),
            "{} offsets in no chunk, first: {:?}",
            missing.len(),
            &missing[..missing.len().min(5)]
        );
    }

    #[test]
    fn test_short_tail_merges_into_previous_chunk() {
        let chunker = TextChunker::new(&ChunkingConfig {
            chunk_size: 20,
            chunk_overlap: 5,
            ..Default::default()
        });
        let content = format!("{} Yes.", "a".repeat(19));
        let chunks = chunker.chunk(&doc(&content));

        assert!(!chunks.is_empty());
        let last = chunks.last().unwrap();
        assert!(last.content.ends_with("Yes."));
        assert_eq!(last.end_offset, content.chars().count() as u64);
    }

    #[test]
    fn test_break_prefers_sentence_boundary() {
        let chunker = small_chunker();
        let content = format!(
            "{} End of sentence. {}",
            "x".repeat(60),
            "y".repeat(120)
        );
        let chunks = chunker.chunk(&doc(&content));
        assert!(chunks.len() > 1);
        assert!(chunks[0].content.ends_with("End of sentence."));
    }
}
