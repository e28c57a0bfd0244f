//! Language-aware text segmentation seam.
//!
//! The index builder and query engine consume tokens through the
//! [`Segmenter`] trait rather than a concrete tokenizer, so a deployment can
//! plug in a dictionary-based segmenter for CJK text. The default
//! [`UnicodeSegmenter`] splits on Unicode word boundaries (UAX #29) and
//! lowercases token text, which keeps index-side and query-side terms
//! comparable.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::Token;
use crate::error::Result;

/// Trait for the external text segmentation component.
pub trait Segmenter: Send + Sync + std::fmt::Debug {
    /// Tokenize for indexing. Implementations may over-generate tokens
    /// (overlapping sub-words) to improve recall; every token carries byte
    /// offsets into `text`. Empty input yields an empty token list, never an
    /// error.
    fn segment_search(&self, text: &str) -> Result<Vec<Token>>;

    /// Tokenize a query segment precisely: one word list, no offsets, no
    /// over-generation.
    fn segment_exact(&self, text: &str) -> Result<Vec<String>>;
}

/// A segmenter that splits text on Unicode word boundaries.
///
/// Word-bound segments that contain no alphanumeric character (whitespace,
/// punctuation) are dropped. Token text is lowercased; offsets refer to the
/// original text.
///
/// # Examples
///
/// ```
/// use sedge::analysis::{Segmenter, UnicodeSegmenter};
///
/// let segmenter = UnicodeSegmenter::new();
/// let tokens = segmenter.segment_search("Hello, 世界!").unwrap();
/// assert_eq!(tokens[0].text, "hello");
/// assert_eq!(tokens[0].start_offset, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnicodeSegmenter;

impl UnicodeSegmenter {
    /// Create a new Unicode word segmenter.
    pub fn new() -> Self {
        UnicodeSegmenter
    }
}

impl Segmenter for UnicodeSegmenter {
    fn segment_search(&self, text: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        for word in text.split_word_bounds() {
            if word.chars().any(|c| c.is_alphanumeric()) {
                tokens.push(Token::new(
                    word.to_lowercase(),
                    offset,
                    offset + word.len(),
                ));
            }
            offset += word.len();
        }
        Ok(tokens)
    }

    fn segment_exact(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .segment_search(text)?
            .into_iter()
            .map(|token| token.text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_track_original_bytes() {
        let segmenter = UnicodeSegmenter::new();
        let tokens = segmenter.segment_search("Hello, world").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[0].start_offset, 0);
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].start_offset, 7);
        assert_eq!(tokens[1].end_offset, 12);
    }

    #[test]
    fn test_multibyte_text_offsets_are_byte_positions() {
        let segmenter = UnicodeSegmenter::new();
        // "héllo wörld": é and ö are two bytes each.
        let tokens = segmenter.segment_search("héllo wörld").unwrap();
        assert_eq!(tokens[0].start_offset, 0);
        assert_eq!(tokens[0].end_offset, 6);
        assert_eq!(tokens[1].start_offset, 7);
    }

    #[test]
    fn test_punctuation_and_whitespace_dropped() {
        let segmenter = UnicodeSegmenter::new();
        let words = segmenter.segment_exact("one—two... three!").unwrap();
        assert_eq!(words, ["one", "two", "three"]);
    }

    #[test]
    fn test_empty_text_yields_no_tokens() {
        let segmenter = UnicodeSegmenter::new();
        assert!(segmenter.segment_search("").unwrap().is_empty());
        assert!(segmenter.segment_exact("   ").unwrap().is_empty());
    }
}
