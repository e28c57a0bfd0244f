//! Snippet extraction: choose and render the most relevant excerpt of a
//! matched post.
//!
//! Body hits are assigned to content lines in one forward pass (hits arrive
//! in increasing offset order), then a fixed-size sliding window over the
//! per-line hit counts picks the densest run of `preview_lines` lines. The
//! window is trimmed from both ends while a boundary line has no hits. A
//! title-only match falls back to the first `preview_lines` lines.
//!
//! Stored hit offsets and lengths are byte positions; before results reach a
//! renderer that indexes into character-counted strings they are translated
//! to Unicode code point positions by [`OffsetTranslator`], which counts
//! non-continuation bytes incrementally instead of rescanning the content
//! for every hit.

use serde::{Deserialize, Serialize};

use crate::query::Hit;

/// Configuration for snippet extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetConfig {
    /// Maximum number of consecutive content lines in a preview.
    pub preview_lines: usize,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        SnippetConfig { preview_lines: 5 }
    }
}

/// A rendered excerpt for one search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// The chosen excerpt of the post body.
    pub preview: String,
    /// The post's hits with offsets and lengths in characters: title hits
    /// first (relative to the title), then body hits (relative to the full
    /// body, not the preview).
    pub hits: Vec<Hit>,
}

/// Incremental byte-to-character offset translation over one text.
///
/// Translation requests must come in non-decreasing byte order; each call
/// continues scanning from the previous position, counting bytes whose top
/// two bits are not `10` (UTF-8 continuation bytes never start a code
/// point).
#[derive(Debug)]
pub struct OffsetTranslator<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    char_pos: u32,
}

impl<'a> OffsetTranslator<'a> {
    /// Create a translator positioned at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        OffsetTranslator {
            bytes: text.as_bytes(),
            byte_pos: 0,
            char_pos: 0,
        }
    }

    /// Character offset of `byte_offset`. Must not be smaller than any
    /// previously translated offset.
    pub fn translate(&mut self, byte_offset: u32) -> u32 {
        let target = (byte_offset as usize).min(self.bytes.len());
        debug_assert!(target >= self.byte_pos, "offsets must be non-decreasing");
        while self.byte_pos < target {
            if !is_continuation(self.bytes[self.byte_pos]) {
                self.char_pos += 1;
            }
            self.byte_pos += 1;
        }
        self.char_pos
    }

    /// Character length of the `byte_len` bytes at `byte_offset`, without
    /// advancing the translation position (hits may overlap).
    pub fn char_len(&self, byte_offset: u32, byte_len: u32) -> u32 {
        let start = (byte_offset as usize).min(self.bytes.len());
        let end = (start + byte_len as usize).min(self.bytes.len());
        self.bytes[start..end]
            .iter()
            .filter(|&&b| !is_continuation(b))
            .count() as u32
    }

    /// Translate one hit's offset and length to characters.
    pub fn translate_hit(&mut self, hit: &Hit) -> Hit {
        let offset = self.translate(hit.offset);
        Hit {
            offset,
            length: self.char_len(hit.offset, hit.length),
            in_title: hit.in_title,
        }
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Selects preview windows and translates hit offsets for display.
#[derive(Debug, Clone, Default)]
pub struct SnippetExtractor {
    config: SnippetConfig,
}

impl SnippetExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: SnippetConfig) -> Self {
        SnippetExtractor { config }
    }

    /// Build the snippet for one matched post.
    ///
    /// `hits` is the post's ranked hit list in posting order: title hits
    /// first, then body hits by increasing offset. Title hit offsets are
    /// relative to `title`, body hit offsets to `content`.
    pub fn extract(&self, title: &str, content: &str, hits: &[Hit]) -> Snippet {
        let body_hits: Vec<Hit> = hits.iter().filter(|h| !h.in_title).copied().collect();

        let preview = if body_hits.is_empty() {
            self.leading_lines(content)
        } else {
            self.densest_window(content, &body_hits)
        };

        let mut translated = Vec::with_capacity(hits.len());
        let mut title_translator = OffsetTranslator::new(title);
        let mut body_translator = OffsetTranslator::new(content);
        for hit in hits {
            let translator = if hit.in_title {
                &mut title_translator
            } else {
                &mut body_translator
            };
            translated.push(translator.translate_hit(hit));
        }

        Snippet {
            preview,
            hits: translated,
        }
    }

    /// First `preview_lines` lines of `content`, for title-only matches.
    fn leading_lines(&self, content: &str) -> String {
        let mut end = 0;
        let bytes = content.as_bytes();
        for _ in 0..self.config.preview_lines {
            if end >= bytes.len() {
                return content.to_string();
            }
            while end < bytes.len() && bytes[end] != b'\n' {
                end += 1;
            }
            end += 1; // past the newline
        }
        content[..end.saturating_sub(1).min(content.len())].to_string()
    }

    /// The `preview_lines`-line window with the highest body hit count,
    /// trimmed of hit-less boundary lines.
    fn densest_window(&self, content: &str, body_hits: &[Hit]) -> String {
        let bytes = content.as_bytes();

        // Lines are materialized lazily while walking the hits forward:
        // line_ends[i] is the byte offset of line i's terminating newline
        // (or the content end for the last line).
        let mut line_end = 0;
        while line_end < bytes.len() && bytes[line_end] != b'\n' {
            line_end += 1;
        }
        let mut line_ends = vec![line_end];
        let mut line_hits = vec![0u32];
        let mut line_index = 0;

        for hit in body_hits {
            // line_end can only stall at the content end, so a stray
            // out-of-range offset lands on the last line instead of looping.
            while hit.offset as usize > line_end && line_end < bytes.len() {
                line_index += 1;
                line_end += 1;
                while line_end < bytes.len() && bytes[line_end] != b'\n' {
                    line_end += 1;
                }
                line_ends.push(line_end);
                line_hits.push(0);
            }
            line_hits[line_index] += 1;
        }

        let line_count = line_hits.len();
        let window = self.config.preview_lines.max(1);

        // Sliding-window maximum of per-line hit counts; first maximum wins.
        let mut max_start = 0;
        if window < line_count {
            let mut sum: u32 = line_hits[..window].iter().sum();
            let mut max_sum = sum;
            for start in 1..=(line_count - window) {
                sum -= line_hits[start - 1];
                sum += line_hits[start - 1 + window];
                if sum > max_sum {
                    max_sum = sum;
                    max_start = start;
                }
            }
        }

        let mut start = max_start;
        let mut end = (max_start + window - 1).min(line_count - 1);
        while end > start && line_hits[end] == 0 {
            end -= 1;
        }
        while start < end && line_hits[start] == 0 {
            start += 1;
        }

        let start_index = if start == 0 { 0 } else { line_ends[start - 1] + 1 };
        let end_index = line_ends[end];
        content[start_index..end_index].to_string()
    }
}
