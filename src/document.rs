//! Post model and the post-store seam.
//!
//! The publishing backend owns post persistence; this crate only reads
//! posts, through the [`PostStore`] trait, to feed the index builder and the
//! snippet renderer. [`MemoryPostStore`] is the in-memory implementation
//! used by tests and small deployments.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SedgeError};

/// A published post.
///
/// `id` is assigned by the backend (nanoseconds since the Unix epoch at
/// creation time) and doubles as the recency order for tag listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post id.
    pub id: u64,
    /// URL slug.
    pub url: String,
    /// Post title.
    pub title: String,
    /// Post body, UTF-8 plain text with `\n` line breaks.
    pub content: String,
    /// Tags attached to this post.
    pub tags: Vec<String>,
    /// Last update time (seconds since epoch).
    pub update_time: u64,
}

/// Read access to the external post storage.
pub trait PostStore: Send + Sync + std::fmt::Debug {
    /// Fetch a post by id.
    fn get_post(&self, id: u64) -> Result<Post>;

    /// List posts in recency order, newest first. `count` of `None` means
    /// all remaining posts. Used by bulk reindexing.
    fn list_posts(&self, offset: usize, count: Option<usize>) -> Result<Vec<Post>>;
}

/// An in-memory post store.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: RwLock<BTreeMap<u64, Post>>,
}

impl MemoryPostStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryPostStore::default()
    }

    /// Insert or replace a post.
    pub fn put_post(&self, post: Post) {
        self.posts.write().insert(post.id, post);
    }

    /// Remove a post.
    pub fn remove_post(&self, id: u64) -> Option<Post> {
        self.posts.write().remove(&id)
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }
}

impl PostStore for MemoryPostStore {
    fn get_post(&self, id: u64) -> Result<Post> {
        self.posts
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| SedgeError::not_found(format!("post {id}")))
    }

    fn list_posts(&self, offset: usize, count: Option<usize>) -> Result<Vec<Post>> {
        let posts = self.posts.read();
        let iter = posts.values().rev().skip(offset).cloned();
        Ok(match count {
            Some(count) => iter.take(count).collect(),
            None => iter.collect(),
        })
    }
}
