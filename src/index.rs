//! Index builder: turns post text into positional postings.
//!
//! Postings and the reverse words-per-post table share one ordered store
//! under the key prefixes `p,` and `w,`, so a whole reindex (stale posting
//! deletes, fresh posting writes and the words-per-post overwrite) is a
//! single atomic batch. After a crash the words-per-post entry is the source
//! of truth for what should be searchable for a post.
//!
//! Posting values are newline-delimited `offset flag` pairs with flag `t`
//! (title) or `b` (body), title occurrences first, then offset ascending:
//! the exact order the query engine's merge-join assumes.

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::Segmenter;
use crate::error::{Result, SedgeError};
use crate::storage::{OkvStore, WriteBatch};

/// One occurrence of a word inside a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Byte offset into the title or body text.
    pub offset: u32,
    /// Whether the occurrence is in the title (title occurrences sort first).
    pub in_title: bool,
}

/// Map from word to its ordered occurrence list for one post.
pub type WordOccurrences = AHashMap<String, Vec<Occurrence>>;

/// Title occurrences before body, offset ascending within each class.
pub(crate) fn occurrence_order(a: &Occurrence, b: &Occurrence) -> Ordering {
    match (a.in_title, b.in_title) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.offset.cmp(&b.offset),
    }
}

/// Key of the posting for `word` in post `id`.
pub(crate) fn posting_key(word: &str, id: u64) -> Vec<u8> {
    format!("p,{word},{id}").into_bytes()
}

/// Scan prefix covering every posting of `word`.
pub(crate) fn posting_prefix(word: &str) -> Vec<u8> {
    format!("p,{word}").into_bytes()
}

/// Key of the words-per-post entry for post `id`.
pub(crate) fn words_key(id: u64) -> Vec<u8> {
    format!("w,{id}").into_bytes()
}

/// Post id from a posting key (`p,<word>,<id>`).
pub(crate) fn posting_key_id(key: &[u8]) -> Result<u64> {
    let segment = key
        .rsplit(|&b| b == b',')
        .next()
        .ok_or_else(|| SedgeError::index("posting key with no id segment"))?;
    std::str::from_utf8(segment)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SedgeError::index("posting key with non-numeric id segment"))
}

/// Comma is the key segment separator and newline delimits the
/// words-per-post list; a word containing either (or a space, the query
/// segment separator) cannot be stored. Both the index and query sides skip
/// such tokens, so they consistently never match.
pub(crate) fn is_indexable(word: &str) -> bool {
    !word.is_empty() && !word.contains([',', '\n', ' '])
}

/// Serialize occurrences as newline-delimited `offset flag` lines.
fn serialize_occurrences(occurrences: &[Occurrence]) -> Vec<u8> {
    let mut out = String::new();
    for occ in occurrences {
        out.push_str(&occ.offset.to_string());
        out.push(' ');
        out.push(if occ.in_title { 't' } else { 'b' });
        out.push('\n');
    }
    out.into_bytes()
}

/// Parse a posting value back into its occurrence list.
pub(crate) fn parse_occurrences(value: &[u8]) -> Result<Vec<Occurrence>> {
    let text = std::str::from_utf8(value)
        .map_err(|_| SedgeError::index("posting value is not UTF-8"))?;
    let mut occurrences = Vec::new();
    for line in text.lines() {
        let (offset, flag) = line
            .split_once(' ')
            .ok_or_else(|| SedgeError::index(format!("malformed posting line: {line:?}")))?;
        let offset = offset
            .parse()
            .map_err(|_| SedgeError::index(format!("malformed posting offset: {offset:?}")))?;
        let in_title = match flag {
            "t" => true,
            "b" => false,
            _ => return Err(SedgeError::index(format!("unknown posting flag: {flag:?}"))),
        };
        occurrences.push(Occurrence { offset, in_title });
    }
    Ok(occurrences)
}

fn parse_words(value: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(value)
        .map_err(|_| SedgeError::index("words-per-post value is not UTF-8"))?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Builds and maintains the postings for posts.
#[derive(Debug)]
pub struct IndexBuilder {
    store: Arc<OkvStore>,
    segmenter: Arc<dyn Segmenter>,
}

impl IndexBuilder {
    /// Create a builder over the shared index store.
    pub fn new(store: Arc<OkvStore>, segmenter: Arc<dyn Segmenter>) -> Self {
        IndexBuilder { store, segmenter }
    }

    /// Segment title and body (search mode) into a word → occurrences map,
    /// title occurrences first. Unsegmentable text yields an empty map.
    pub fn generate(&self, title: &str, body: &str) -> Result<WordOccurrences> {
        let mut map = WordOccurrences::new();

        for token in self.segmenter.segment_search(title)? {
            if is_indexable(&token.text) {
                map.entry(token.text).or_default().push(Occurrence {
                    offset: token.start_offset as u32,
                    in_title: true,
                });
            }
        }
        for token in self.segmenter.segment_search(body)? {
            if is_indexable(&token.text) {
                map.entry(token.text).or_default().push(Occurrence {
                    offset: token.start_offset as u32,
                    in_title: false,
                });
            }
        }

        for occurrences in map.values_mut() {
            occurrences.sort_by(occurrence_order);
        }
        Ok(map)
    }

    /// Replace post `id`'s postings with `occurrences`, wholesale.
    ///
    /// Stale postings (words no longer present) are deleted, fresh postings
    /// written, and the words-per-post entry overwritten, all in one atomic
    /// batch.
    pub fn set_indexes(&self, id: u64, occurrences: &WordOccurrences) -> Result<()> {
        let mut batch = WriteBatch::new();

        if let Some(previous) = self.store.get(&words_key(id)) {
            for word in parse_words(&previous)? {
                if !occurrences.contains_key(&word) {
                    batch.delete(posting_key(&word, id));
                }
            }
        }

        let mut words: Vec<&str> = occurrences.keys().map(String::as_str).collect();
        words.sort_unstable();
        for word in &words {
            batch.put(posting_key(word, id), serialize_occurrences(&occurrences[*word]));
        }

        if words.is_empty() {
            batch.delete(words_key(id));
        } else {
            batch.put(words_key(id), words.join("\n").into_bytes());
        }

        log::debug!(
            "set_indexes: post {id}, {} word(s), {} op(s)",
            words.len(),
            batch.len()
        );
        self.store.apply(batch)
    }

    /// Delete every posting listed for post `id` and its words-per-post
    /// entry. Fails with NotFound when the post has no index entry.
    pub fn clear_indexes(&self, id: u64) -> Result<()> {
        let value = self
            .store
            .get(&words_key(id))
            .ok_or_else(|| SedgeError::not_found(format!("no index entry for post {id}")))?;

        let mut batch = WriteBatch::new();
        for word in parse_words(&value)? {
            batch.delete(posting_key(&word, id));
        }
        batch.delete(words_key(id));

        log::debug!("clear_indexes: post {id}, {} op(s)", batch.len());
        self.store.apply(batch)
    }
}
