//! High-level search engine that combines indexing, querying and snippet
//! rendering.
//!
//! [`SearchEngine`] is the explicit service object the handler layer holds:
//! it owns the ordered stores, the result cache, the segmenter and the
//! global write lock. Index mutations (`reindex`, `clear_indexes`) are
//! serialized by that lock and always invalidate the whole result cache
//! before returning, so a search that starts after a reindex completes is
//! guaranteed to see the new index.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analysis::Segmenter;
use crate::cache::ResultCache;
use crate::document::{Post, PostStore};
use crate::error::{Result, SedgeError};
use crate::index::IndexBuilder;
use crate::query::{Hit, QueryEngine, SearchResults};
use crate::snippet::{Snippet, SnippetConfig, SnippetExtractor};
use crate::storage::{CompositeComparator, Direction, OkvStore, Storage, WriteBatch};

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of cached query results.
    pub cache_capacity: usize,
    /// Maximum number of content lines in a result preview.
    pub preview_lines: usize,
    /// Snapshot the ordered stores after this many logged write batches.
    pub wal_compaction_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_capacity: 64,
            preview_lines: 5,
            wal_compaction_threshold: 64,
        }
    }
}

/// One rendered entry of a search results page.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRecord {
    /// Matched post id.
    pub post_id: u64,
    /// URL slug of the post.
    pub url: String,
    /// Tags of the post.
    pub tags: Vec<String>,
    /// Last update time of the post.
    pub updated: u64,
    /// Chosen excerpt with hits translated to character offsets.
    #[serde(flatten)]
    pub snippet: Snippet,
}

/// A page of rendered search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// Records for the requested page.
    pub results: Vec<SearchRecord>,
    /// Total number of pages at the requested page size.
    pub pages: u64,
}

/// The search service: index builder, query engine, cache and snippet
/// extractor behind one handle.
#[derive(Debug)]
pub struct SearchEngine {
    index_store: Arc<OkvStore>,
    tag_store: OkvStore,
    builder: IndexBuilder,
    query: QueryEngine,
    cache: Arc<ResultCache>,
    extractor: SnippetExtractor,
    posts: Arc<dyn PostStore>,
    /// Serializes index mutations with cache invalidation.
    write_lock: Mutex<()>,
}

impl SearchEngine {
    /// Open (or create) the engine's stores inside `storage`.
    pub fn open(
        storage: Arc<dyn Storage>,
        posts: Arc<dyn PostStore>,
        segmenter: Arc<dyn Segmenter>,
        config: EngineConfig,
    ) -> Result<Self> {
        let index_store = Arc::new(OkvStore::open(
            storage.clone(),
            "index",
            CompositeComparator::ascending(),
            config.wal_compaction_threshold,
        )?);
        // Tag entries scan newest-first within a tag.
        let tag_store = OkvStore::open(
            storage,
            "tags",
            CompositeComparator::new(vec![Direction::Asc, Direction::Desc]),
            config.wal_compaction_threshold,
        )?;

        let cache = Arc::new(ResultCache::new(config.cache_capacity));
        let builder = IndexBuilder::new(index_store.clone(), segmenter.clone());
        let query = QueryEngine::new(index_store.clone(), segmenter, cache.clone());
        let extractor = SnippetExtractor::new(SnippetConfig {
            preview_lines: config.preview_lines,
        });

        Ok(SearchEngine {
            index_store,
            tag_store,
            builder,
            query,
            cache,
            extractor,
            posts,
            write_lock: Mutex::new(()),
        })
    }

    /// Regenerate a post's postings wholesale and invalidate the cache.
    pub fn reindex(&self, post: &Post) -> Result<()> {
        let _guard = self.write_lock.lock();
        let occurrences = self.builder.generate(&post.title, &post.content)?;
        self.builder.set_indexes(post.id, &occurrences)?;
        self.cache.invalidate();
        Ok(())
    }

    /// Reindex every post in the post store.
    pub fn reindex_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        let posts = self.posts.list_posts(0, None)?;
        let count = posts.len();
        for post in posts {
            let occurrences = self.builder.generate(&post.title, &post.content)?;
            self.builder.set_indexes(post.id, &occurrences)?;
        }
        self.cache.invalidate();
        log::info!("reindexed {count} post(s)");
        Ok(())
    }

    /// Drop a post's postings entirely. Fails with NotFound when the post
    /// was never indexed.
    pub fn clear_indexes(&self, id: u64) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.builder.clear_indexes(id)?;
        self.cache.invalidate();
        Ok(())
    }

    /// Clear the result cache without touching the index.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Run a search, serving from cache when possible.
    pub fn search(&self, raw_query: &str) -> Result<SearchResults> {
        self.query.search(raw_query)
    }

    /// Render the snippet for one matched post.
    pub fn snippet(&self, post: &Post, hits: &[Hit]) -> Snippet {
        self.extractor.extract(&post.title, &post.content, hits)
    }

    /// Run a search and render one page of records with previews, the
    /// surface the handler layer serves directly.
    pub fn search_page(
        &self,
        raw_query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let results = self.search(raw_query)?;
        let page_size = page_size.max(1);
        let pages = (results.len() + page_size - 1) / page_size;

        let mut records = Vec::new();
        for (id, hits) in results
            .iter()
            .skip(page.saturating_sub(1) * page_size)
            .take(page_size)
        {
            let post = self.posts.get_post(*id)?;
            let snippet = self.snippet(&post, hits);
            records.push(SearchRecord {
                post_id: *id,
                url: post.url,
                tags: post.tags,
                updated: post.update_time,
                snippet,
            });
        }

        Ok(SearchPage {
            results: records,
            pages: pages as u64,
        })
    }

    /// Add tag membership entries for a post.
    pub fn add_tag_entries(&self, id: u64, tags: &[String]) -> Result<()> {
        self.add_remove_tag_entries(id, tags, &[])
    }

    /// Remove tag membership entries for a post.
    pub fn remove_tag_entries(&self, id: u64, tags: &[String]) -> Result<()> {
        self.add_remove_tag_entries(id, &[], tags)
    }

    /// Apply tag additions and removals for a post as one batch.
    pub fn add_remove_tag_entries(
        &self,
        id: u64,
        added: &[String],
        removed: &[String],
    ) -> Result<()> {
        let mut batch = WriteBatch::new();
        for tag in added {
            batch.put(tag_key(tag, id)?, id.to_string().into_bytes());
        }
        for tag in removed {
            batch.delete(tag_key(tag, id)?);
        }
        self.tag_store.apply(batch)
    }

    /// Post ids carrying `tag`, newest first. Only the requested window of
    /// the tag run is materialized.
    pub fn list_posts_by_tag(&self, tag: &str, offset: usize, count: Option<usize>) -> Result<Vec<u64>> {
        self.tag_store
            .scan_prefix_bounded(tag.as_bytes(), offset, count)
            .into_iter()
            .map(|(_, value)| {
                std::str::from_utf8(&value)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| SedgeError::storage("malformed tag entry value"))
            })
            .collect()
    }

    /// Number of postings plus words-per-post entries, for diagnostics.
    pub fn index_len(&self) -> usize {
        self.index_store.len()
    }
}

/// Tag entry key. The comma is the key separator, so it cannot appear in a
/// tag name.
fn tag_key(tag: &str, id: u64) -> Result<Vec<u8>> {
    if tag.is_empty() || tag.contains(',') {
        return Err(SedgeError::other(format!("invalid tag name: {tag:?}")));
    }
    Ok(format!("{tag},{id}").into_bytes())
}
