//! Token type produced by segmenters.

use serde::{Deserialize, Serialize};

/// A single word token with its byte offsets in the original text.
///
/// Offsets always refer to the text as passed to the segmenter, before any
/// case folding applied to `text` itself.
///
/// # Examples
///
/// ```
/// use sedge::analysis::Token;
///
/// let token = Token::new("hello", 0, 5);
/// assert_eq!(token.text, "hello");
/// assert_eq!(token.start_offset, 0);
/// assert_eq!(token.end_offset, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token's text content.
    pub text: String,

    /// The byte offset where this token starts in the original text.
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text.
    pub end_offset: usize,
}

impl Token {
    /// Create a new token.
    pub fn new(text: impl Into<String>, start_offset: usize, end_offset: usize) -> Self {
        Token {
            text: text.into(),
            start_offset,
            end_offset,
        }
    }
}
