//! # Sedge
//!
//! Search indexing and query retrieval for a content-publishing backend.
//!
//! ## Features
//!
//! - Positional inverted index over post titles and bodies
//! - Ordered key-value storage with pluggable composite-key comparators
//! - Multi-term queries with phrase-aware merge-joins and hit-count ranking
//! - Bounded LRU result cache with content-driven invalidation
//! - Snippet extraction with UTF-8-safe offset translation
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use sedge::analysis::UnicodeSegmenter;
//! use sedge::document::{MemoryPostStore, Post};
//! use sedge::engine::{EngineConfig, SearchEngine};
//! use sedge::storage::MemoryStorage;
//!
//! # fn main() -> sedge::error::Result<()> {
//! let posts = Arc::new(MemoryPostStore::new());
//! let engine = SearchEngine::open(
//!     Arc::new(MemoryStorage::new()),
//!     posts.clone(),
//!     Arc::new(UnicodeSegmenter::new()),
//!     EngineConfig::default(),
//! )?;
//!
//! let post = Post {
//!     id: 1,
//!     url: "hello-world".into(),
//!     title: "Hello world".into(),
//!     content: "The first post.".into(),
//!     tags: vec!["meta".into()],
//!     update_time: 1,
//! };
//! posts.put_post(post.clone());
//! engine.reindex(&post)?;
//!
//! let results = engine.search("first post")?;
//! assert_eq!(results[0].0, 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod snippet;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
