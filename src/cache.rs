//! Bounded LRU cache for computed search results.
//!
//! Keyed by the raw query string. Any index mutation clears the whole cache;
//! there is no partial invalidation by affected post.
//!
//! Searches run without holding the engine write lock, so a result computed
//! while a reindex was in flight may describe a mixed index state. The cache
//! carries a generation counter: `invalidate` bumps it, and a `put` whose
//! caller observed an older generation is dropped instead of poisoning the
//! cache for searches that start after the reindex completed.
//!
//! Cache operations never fail. A hit returns an owned copy of the results,
//! so serving from cache never touches the ordered store.

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::query::SearchResults;

#[derive(Debug)]
struct CacheEntry {
    results: SearchResults,
    /// Recency stamp; larger is more recent.
    stamp: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: AHashMap<String, CacheEntry>,
    clock: u64,
    /// Bumped by every `invalidate`; guards `put` against stale results.
    generation: u64,
}

/// A fixed-capacity least-recently-used result cache.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries. A capacity of
    /// zero disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        ResultCache {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Current invalidation generation. Callers observe it before computing
    /// a result and hand it back to [`ResultCache::put`].
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Look up `query`, promoting the entry to most-recently-used on a hit.
    pub fn get(&self, query: &str) -> Option<SearchResults> {
        let mut inner = self.inner.lock();
        inner.clock += 1;
        let clock = inner.clock;
        match inner.entries.get_mut(query) {
            Some(entry) => {
                entry.stamp = clock;
                log::debug!("result cache hit: {query:?}");
                Some(entry.results.clone())
            }
            None => None,
        }
    }

    /// Insert a computed result as most-recently-used. `generation` is the
    /// value [`ResultCache::generation`] returned before the caller started
    /// reading the index.
    ///
    /// If the generation has moved (the index was mutated mid-computation)
    /// the result is dropped. If an identical query raced its way in first,
    /// the existing entry is kept. At capacity, the least-recently-used
    /// entry is evicted before inserting.
    pub fn put(&self, query: &str, results: SearchResults, generation: u64) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            log::debug!("result cache dropping stale result: {query:?}");
            return;
        }
        if inner.entries.contains_key(query) {
            return;
        }
        if inner.entries.len() >= self.capacity {
            // Capacity stays small; a linear scan finds the LRU entry.
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stamp)
                .map(|(query, _)| query.clone())
            {
                log::debug!("result cache evicting: {oldest:?}");
                inner.entries.remove(&oldest);
            }
        }
        inner.clock += 1;
        let stamp = inner.clock;
        inner
            .entries
            .insert(query.to_string(), CacheEntry { results, stamp });
    }

    /// Drop every cached result and advance the generation. Called after
    /// any index mutation, even when the cache is already empty, so that
    /// in-flight searches cannot insert results computed against the old
    /// index.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        if !inner.entries.is_empty() {
            log::debug!("result cache invalidated ({} entries)", inner.entries.len());
        }
        inner.entries.clear();
        inner.generation += 1;
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(id: u64) -> SearchResults {
        vec![(id, Vec::new())]
    }

    fn put(cache: &ResultCache, query: &str, id: u64) {
        cache.put(query, results(id), cache.generation());
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = ResultCache::new(2);
        assert!(cache.get("q").is_none());
        put(&cache, "q", 1);
        assert_eq!(cache.get("q").unwrap()[0].0, 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = ResultCache::new(2);
        put(&cache, "q1", 1);
        put(&cache, "q2", 2);
        put(&cache, "q3", 3);

        // q1 was least recently used and must be gone; q2/q3 remain.
        assert!(cache.get("q1").is_none());
        assert!(cache.get("q2").is_some());
        assert!(cache.get("q3").is_some());
    }

    #[test]
    fn test_get_promotes_entry() {
        let cache = ResultCache::new(2);
        put(&cache, "q1", 1);
        put(&cache, "q2", 2);
        assert!(cache.get("q1").is_some());
        put(&cache, "q3", 3);

        // q2 became the oldest once q1 was touched.
        assert!(cache.get("q2").is_none());
        assert!(cache.get("q1").is_some());
    }

    #[test]
    fn test_put_keeps_existing_entry_on_race() {
        let cache = ResultCache::new(2);
        put(&cache, "q", 1);
        put(&cache, "q", 2);
        assert_eq!(cache.get("q").unwrap()[0].0, 1);
    }

    #[test]
    fn test_invalidate_clears_all() {
        let cache = ResultCache::new(4);
        put(&cache, "a", 1);
        put(&cache, "b", 2);
        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_put_dropped_when_generation_moved() {
        let cache = ResultCache::new(2);
        let generation = cache.generation();
        // The index was mutated while this result was being computed.
        cache.invalidate();
        cache.put("q", results(1), generation);
        assert!(cache.get("q").is_none());

        // A result computed against the current generation still lands.
        cache.put("q", results(2), cache.generation());
        assert_eq!(cache.get("q").unwrap()[0].0, 2);
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = ResultCache::new(0);
        put(&cache, "q", 1);
        assert!(cache.get("q").is_none());
    }
}
