//! Query engine: multi-term search with phrase-aware ranking.
//!
//! A raw query splits on single spaces into segments. Each segment is
//! tokenized exactly and matched as an intersection over its words: a post
//! survives a segment only when it holds a posting for every word, and the
//! surviving occurrence lists are merged in posting order (title before
//! body, offset ascending) so hits come out in text order. Word adjacency
//! within a segment is approximated by that ordering; exact consecutive
//! offsets are not verified.
//!
//! A post must match every segment of the query. Segments that tokenize to
//! no words (bare punctuation) are ignored rather than matching nothing.
//!
//! Results are ranked by total hit count, descending.

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::Segmenter;
use crate::cache::ResultCache;
use crate::error::Result;
use crate::index::{is_indexable, parse_occurrences, posting_key_id, posting_prefix, Occurrence};
use crate::storage::OkvStore;

/// One matched word occurrence contributing to a search match.
///
/// `offset` and `length` are byte positions until the snippet extractor
/// translates them to character positions for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Byte offset of the match in the title or body text.
    pub offset: u32,
    /// Byte length of the matched word.
    pub length: u32,
    /// Whether the match is in the title.
    #[serde(rename = "title")]
    pub in_title: bool,
}

/// Ranked search results: `(post id, ordered hit list)`, best match first.
pub type SearchResults = Vec<(u64, Vec<Hit>)>;

/// Title hits before body hits, offset ascending within each class: the
/// posting order, which keeps merged hit lists in text order.
fn hit_order(a: &Hit, b: &Hit) -> Ordering {
    match (a.in_title, b.in_title) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.offset.cmp(&b.offset),
    }
}

/// Merge two hit lists already sorted by [`hit_order`], keeping that order.
/// Ties take from `a` first.
fn merge_hits(a: &[Hit], b: &[Hit]) -> Vec<Hit> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut ai = 0;
    let mut bi = 0;
    while ai < a.len() && bi < b.len() {
        if hit_order(&b[bi], &a[ai]) == Ordering::Less {
            merged.push(b[bi]);
            bi += 1;
        } else {
            merged.push(a[ai]);
            ai += 1;
        }
    }
    merged.extend_from_slice(&a[ai..]);
    merged.extend_from_slice(&b[bi..]);
    merged
}

fn occurrences_to_hits(occurrences: &[Occurrence], word_len: u32) -> Vec<Hit> {
    occurrences
        .iter()
        .map(|occ| Hit {
            offset: occ.offset,
            length: word_len,
            in_title: occ.in_title,
        })
        .collect()
}

/// Executes searches against the postings store, through the result cache.
#[derive(Debug)]
pub struct QueryEngine {
    store: Arc<OkvStore>,
    segmenter: Arc<dyn Segmenter>,
    cache: Arc<ResultCache>,
}

impl QueryEngine {
    /// Create a query engine over the shared index store and cache.
    pub fn new(
        store: Arc<OkvStore>,
        segmenter: Arc<dyn Segmenter>,
        cache: Arc<ResultCache>,
    ) -> Self {
        QueryEngine {
            store,
            segmenter,
            cache,
        }
    }

    /// Run a search, serving from cache when possible.
    ///
    /// The cache generation is observed before any posting is read; if an
    /// index mutation invalidates the cache while this search is computing,
    /// the result is returned but not cached.
    pub fn search(&self, raw_query: &str) -> Result<SearchResults> {
        let generation = self.cache.generation();
        if let Some(cached) = self.cache.get(raw_query) {
            return Ok(cached);
        }
        log::debug!("result cache miss, executing: {raw_query:?}");

        let mut total: Option<AHashMap<u64, Vec<Hit>>> = None;

        for segment in raw_query.split(' ').filter(|s| !s.is_empty()) {
            let Some(segment_result) = self.match_segment(segment)? else {
                continue;
            };
            total = Some(match total {
                None => segment_result,
                Some(accumulated) => {
                    let mut surviving = AHashMap::with_capacity(accumulated.len());
                    for (id, hits) in accumulated {
                        if let Some(other) = segment_result.get(&id) {
                            surviving.insert(id, merge_hits(&hits, other));
                        }
                    }
                    surviving
                }
            });
        }

        let mut results: SearchResults = total.unwrap_or_default().into_iter().collect();
        // Hit count descending; newest post first among equal counts.
        results.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(b.0.cmp(&a.0)));

        self.cache.put(raw_query, results.clone(), generation);
        Ok(results)
    }

    /// Match one whitespace-delimited segment: the intersection of its
    /// words' postings, with occurrence lists merged in posting order.
    /// Returns `None` when the segment tokenizes to no words.
    fn match_segment(&self, segment: &str) -> Result<Option<AHashMap<u64, Vec<Hit>>>> {
        let words: Vec<String> = self
            .segmenter
            .segment_exact(segment)?
            .into_iter()
            .filter(|w| is_indexable(w))
            .collect();
        if words.is_empty() {
            return Ok(None);
        }

        let mut current: Option<AHashMap<u64, Vec<Hit>>> = None;

        for word in &words {
            let postings = self.fetch_postings(word)?;
            let word_len = word.len() as u32;

            current = Some(match current {
                None => postings
                    .iter()
                    .map(|(&id, occs)| (id, occurrences_to_hits(occs, word_len)))
                    .collect(),
                Some(tentative) => {
                    let mut surviving = AHashMap::with_capacity(tentative.len());
                    for (id, hits) in tentative {
                        if let Some(occs) = postings.get(&id) {
                            let merged =
                                merge_hits(&hits, &occurrences_to_hits(occs, word_len));
                            surviving.insert(id, merged);
                        }
                        // Posts without a posting for this word drop out of
                        // the whole segment.
                    }
                    surviving
                }
            });
        }

        Ok(Some(current.unwrap_or_default()))
    }

    /// Load every posting of `word` as post id → occurrence list.
    fn fetch_postings(&self, word: &str) -> Result<AHashMap<u64, Vec<Occurrence>>> {
        let mut postings = AHashMap::new();
        for (key, value) in self.store.scan_prefix(&posting_prefix(word)) {
            postings.insert(posting_key_id(&key)?, parse_occurrences(&value)?);
        }
        Ok(postings)
    }
}
