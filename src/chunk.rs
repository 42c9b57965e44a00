//! Overlapping word-window text chunker.
//!
//! Splits document text into [`ChunkSpan`]s of `chunk_size` whitespace
//! delimited words, advancing `chunk_size - overlap` words per step, so
//! consecutive windows share exactly `overlap` words. The final window may
//! be shorter than `chunk_size` and is always emitted.
//!
//! Chunking is pure and deterministic: the same text and parameters always
//! yield the same spans, which makes re-indexing an unchanged document
//! idempotent.
//!
//! # Algorithm
//!
//! 1. Split the text into words, remembering the 1-based blank-line
//!    separated paragraph each word belongs to.
//! 2. Emit `words[start..min(start + chunk_size, n)]` joined by single spaces.
//! 3. Stop once a window reaches the last word; otherwise advance `start`.
//! 4. Tag each span with the first `[Page N]` marker in its text, and with
//!    the paragraph of its first word.
//!
//! # Example
//!
//! ```rust
//! use tender_rag::chunk::split_words;
//!
//! let spans = split_words("alpha beta gamma delta", 2, 1).unwrap();
//! let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
//! assert_eq!(texts, ["alpha beta", "beta gamma", "gamma delta"]);
//! assert_eq!((spans[2].start_offset, spans[2].end_offset), (2, 4));
//! ```

use crate::error::{RagError, Result};
use crate::models::ChunkSpan;

const PAGE_MARKER: &str = "[Page ";

/// Split `text` into overlapping word windows.
///
/// # Errors
///
/// Returns [`RagError::Config`] when `chunk_size` is zero or `overlap` is
/// not strictly less than `chunk_size`.
pub fn split_words(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<ChunkSpan>> {
    if chunk_size == 0 {
        return Err(RagError::Config("chunk_size must be > 0".to_string()));
    }
    if overlap >= chunk_size {
        return Err(RagError::Config(format!(
            "overlap ({}) must be less than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    let words = words_with_paragraphs(text);
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut spans = Vec::with_capacity(words.len() / step + 1);
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(words.len());
        let text = words[start..end]
            .iter()
            .map(|(w, _)| *w)
            .collect::<Vec<_>>()
            .join(" ");
        let page_number = find_page_marker(&text);

        spans.push(ChunkSpan {
            text,
            start_offset: start,
            end_offset: end,
            page_number,
            paragraph_number: Some(words[start].1),
        });

        if end == words.len() {
            break;
        }
        start += step;
    }

    Ok(spans)
}

/// Words in order, each paired with its 1-based paragraph number.
fn words_with_paragraphs(text: &str) -> Vec<(&str, i64)> {
    let mut words = Vec::new();
    let mut paragraph = 1;
    let mut paragraph_has_words = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            if paragraph_has_words {
                paragraph += 1;
                paragraph_has_words = false;
            }
            continue;
        }
        for word in line.split_whitespace() {
            words.push((word, paragraph));
            paragraph_has_words = true;
        }
    }

    words
}

/// First `[Page N]` marker in `text`, if any.
fn find_page_marker(text: &str) -> Option<i64> {
    let mut rest = text;
    while let Some(pos) = rest.find(PAGE_MARKER) {
        let after = &rest[pos + PAGE_MARKER.len()..];
        let digits_len = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len > 0 && after[digits_len..].starts_with(']') {
            if let Ok(n) = after[..digits_len].parse() {
                return Some(n);
            }
        }
        rest = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cover(spans: &[ChunkSpan], word_count: usize, chunk_size: usize, overlap: usize) {
        assert_eq!(spans.first().map(|s| s.start_offset), Some(0));
        assert_eq!(spans.last().map(|s| s.end_offset), Some(word_count));
        for s in spans {
            assert!(s.end_offset - s.start_offset <= chunk_size);
            assert!(s.end_offset > s.start_offset);
        }
        for pair in spans.windows(2) {
            assert_eq!(
                pair[0].end_offset - pair[1].start_offset,
                overlap,
                "consecutive windows must share exactly {} words",
                overlap
            );
        }
    }

    #[test]
    fn test_scenario_three_windows() {
        let spans = split_words("alpha beta gamma delta", 2, 1).unwrap();
        let got: Vec<(&str, usize, usize)> = spans
            .iter()
            .map(|s| (s.text.as_str(), s.start_offset, s.end_offset))
            .collect();
        assert_eq!(
            got,
            vec![
                ("alpha beta", 0, 2),
                ("beta gamma", 1, 3),
                ("gamma delta", 2, 4)
            ]
        );
    }

    #[test]
    fn test_empty_and_whitespace_text_yield_no_chunks() {
        assert!(split_words("", 10, 2).unwrap().is_empty());
        assert!(split_words("  \n\t \n", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let spans = split_words("just three words", 512, 50).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "just three words");
        assert_eq!((spans[0].start_offset, spans[0].end_offset), (0, 3));
    }

    #[test]
    fn test_final_short_window_is_kept() {
        // 7 words, size 3, overlap 1 → starts 0, 2, 4; last window [4, 7)
        let spans = split_words("a b c d e f g", 3, 1).unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[2].text, "e f g");

        // 6 words: last window [4, 6) is shorter but still emitted
        let spans = split_words("a b c d e f", 3, 1).unwrap();
        assert_eq!(spans.last().unwrap().text, "e f");
        assert_cover(&spans, 6, 3, 1);
    }

    #[test]
    fn test_coverage_across_parameters() {
        let text = (0..137)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        for (size, overlap) in [(1, 0), (2, 1), (5, 0), (10, 3), (50, 49), (200, 20)] {
            let spans = split_words(&text, size, overlap).unwrap();
            assert_cover(&spans, 137, size, overlap);
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(matches!(split_words("a b", 0, 0), Err(RagError::Config(_))));
        assert!(matches!(split_words("a b", 4, 4), Err(RagError::Config(_))));
        assert!(matches!(split_words("a b", 4, 9), Err(RagError::Config(_))));
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let spans = split_words("  alpha\t\tbeta \n gamma  ", 10, 0).unwrap();
        assert_eq!(spans[0].text, "alpha beta gamma");
    }

    #[test]
    fn test_page_marker_detected() {
        let spans = split_words("intro text [Page 3] scope of works", 4, 0).unwrap();
        assert_eq!(spans[0].text, "intro text [Page 3]");
        assert_eq!(spans[0].page_number, Some(3));
        assert_eq!(spans[1].page_number, None);
    }

    #[test]
    fn test_page_marker_requires_digits_and_bracket() {
        assert_eq!(find_page_marker("[Page x] [Page 12]"), Some(12));
        assert_eq!(find_page_marker("[Page 7"), None);
        assert_eq!(find_page_marker("[page 7]"), None);
        assert_eq!(find_page_marker("no marker"), None);
    }

    #[test]
    fn test_paragraph_numbers() {
        let text = "one two\nthree\n\n\nfour five\n   \nsix";
        let spans = split_words(text, 2, 0).unwrap();
        let paras: Vec<Option<i64>> = spans.iter().map(|s| s.paragraph_number).collect();
        // windows: [one two] [three four] [five six]
        assert_eq!(paras, vec![Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta\n\ngamma delta epsilon [Page 2] zeta eta";
        assert_eq!(split_words(text, 3, 1).unwrap(), split_words(text, 3, 1).unwrap());
    }
}
