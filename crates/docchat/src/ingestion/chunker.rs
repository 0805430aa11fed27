//! Text chunking with stable offsets
//!
//! Chunks are exact substrings of the page-joined document text. The
//! overlap is re-included verbatim at the start of the next chunk, so a
//! fact spanning a boundary remains retrievable. Identical input and
//! parameters always produce identical chunk boundaries.

use unicode_segmentation::UnicodeSegmentation;

/// Separator inserted between page texts before chunking
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A chunk boundary over the joined document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Text content, an exact substring of the joined text
    pub text: String,
    /// Byte offset of the chunk start in the joined text
    pub char_start: usize,
    /// Byte offset one past the chunk end
    pub char_end: usize,
}

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in bytes
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
    /// Trailing chunks shorter than this are folded into the previous chunk
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize, min_size: usize) -> Self {
        // Overlap must leave room for forward progress
        let overlap = overlap.min(chunk_size / 2);
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
            min_size,
        }
    }

    /// Join page texts into the single string the chunker operates on
    pub fn join_pages(pages: &[String]) -> String {
        pages.join(PAGE_SEPARATOR)
    }

    /// Chunk page texts into overlapping spans
    pub fn chunk(&self, pages: &[String]) -> Vec<ChunkSpan> {
        let text = Self::join_pages(pages);
        self.chunk_text(&text)
    }

    /// Chunk a single text into overlapping spans
    pub fn chunk_text(&self, text: &str) -> Vec<ChunkSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let atoms = self.split_atoms(text);

        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut chunk_start = 0usize;
        let mut chunk_end = 0usize;
        let mut atoms_in_chunk = 0usize;

        for (start, end) in atoms {
            if atoms_in_chunk > 0 && end - chunk_start > self.chunk_size {
                spans.push((chunk_start, chunk_end));
                chunk_start = floor_char_boundary(text, chunk_end.saturating_sub(self.overlap));
                atoms_in_chunk = 0;
            }
            chunk_end = end;
            atoms_in_chunk += 1;
        }

        if atoms_in_chunk > 0 {
            // Fold an undersized tail into the previous chunk
            if chunk_end - chunk_start < self.min_size {
                if let Some(last) = spans.last_mut() {
                    last.1 = chunk_end;
                } else {
                    spans.push((chunk_start, chunk_end));
                }
            } else {
                spans.push((chunk_start, chunk_end));
            }
        }

        spans
            .into_iter()
            .map(|(start, end)| ChunkSpan {
                text: text[start..end].to_string(),
                char_start: start,
                char_end: end,
            })
            .collect()
    }

    /// Split text into sentence atoms, hard-cutting any sentence that
    /// exceeds the chunk size on its own
    fn split_atoms(&self, text: &str) -> Vec<(usize, usize)> {
        let mut atoms = Vec::new();

        for (offset, sentence) in text.split_sentence_bound_indices() {
            if sentence.len() <= self.chunk_size {
                atoms.push((offset, offset + sentence.len()));
                continue;
            }

            // Hard cut at character boundaries
            let mut start = offset;
            let end = offset + sentence.len();
            while start < end {
                let cut = floor_char_boundary(text, (start + self.chunk_size).min(end));
                // A multi-byte character wider than chunk_size cannot be split
                let cut = if cut <= start {
                    ceil_char_boundary(text, start + 1).min(end)
                } else {
                    cut
                };
                atoms.push((start, cut));
                start = cut;
            }
        }

        atoms
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spans_of(text: &str, size: usize, overlap: usize) -> Vec<ChunkSpan> {
        TextChunker::new(size, overlap, 0).chunk_text(text)
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(spans_of("", 100, 10).is_empty());
        assert!(spans_of("   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = spans_of("Hello world. Short text.", 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world. Short text.");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].char_end, 24);
    }

    #[test]
    fn chunks_are_exact_substrings() {
        let text = "One sentence here. Another sentence follows. A third one. \
                    And a fourth for good measure. Then a fifth sentence.";
        for chunk in spans_of(text, 40, 10) {
            assert_eq!(chunk.text, &text[chunk.char_start..chunk.char_end]);
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = "First sentence ends here. Second sentence ends here. \
                    Third sentence ends here. Fourth sentence ends here.";
        let chunks = spans_of(text, 60, 15);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            assert!(pair[1].char_start < pair[0].char_end);
            assert!(pair[1].char_start > pair[0].char_start);
        }
    }

    #[test]
    fn overlap_stripping_reconstructs_text() {
        let text = "Alpha sentence one. Beta sentence two. Gamma sentence three. \
                    Delta sentence four. Epsilon sentence five. Zeta sentence six.";
        let chunks = spans_of(text, 50, 12);
        let mut rebuilt = String::new();
        let mut covered = 0usize;
        for chunk in &chunks {
            rebuilt.push_str(&chunk.text[covered.saturating_sub(chunk.char_start)..]);
            covered = chunk.char_end;
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn oversize_paragraph_is_hard_cut() {
        let text = "x".repeat(500);
        let chunks = spans_of(&text, 100, 0);
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 100);
        }
    }

    #[test]
    fn multibyte_text_cuts_at_char_boundaries() {
        let text = "é".repeat(300);
        for chunk in spans_of(&text, 101, 10) {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn undersized_tail_folds_into_previous_chunk() {
        let text = "A full sentence that fills a chunk nicely right here. Tail.";
        let chunks = TextChunker::new(55, 0, 20).chunk_text(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_end, text.len());
    }

    #[test]
    fn pages_join_with_separator() {
        let pages = vec!["Page one text.".to_string(), "Page two text.".to_string()];
        let chunks = TextChunker::new(1000, 50, 0).chunk(&pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Page one text.\n\nPage two text.");
    }

    proptest! {
        #[test]
        fn chunking_is_deterministic(
            text in "\\PC{0,2000}",
            size in 20usize..500,
            overlap in 0usize..50,
        ) {
            let a = spans_of(&text, size, overlap);
            let b = spans_of(&text, size, overlap);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn chunks_cover_text_without_gaps(
            text in "[a-zA-Z .!?]{1,2000}",
            size in 20usize..300,
            overlap in 0usize..10,
        ) {
            let chunks = spans_of(&text, size, overlap);
            if text.trim().is_empty() {
                prop_assert!(chunks.is_empty());
            } else {
                prop_assert_eq!(chunks[0].char_start, 0);
                prop_assert_eq!(chunks.last().unwrap().char_end, text.len());
                for pair in chunks.windows(2) {
                    prop_assert!(pair[1].char_start <= pair[0].char_end);
                }
            }
        }
    }
}
