//! Ordered key-value storage.
//!
//! The [`okv::OkvStore`] is the durable owner of postings, words-per-post
//! lists and tag entries. It is parameterized by a
//! [`comparator::CompositeComparator`] and backed by a pluggable
//! [`traits::Storage`] (memory or file system).

pub mod comparator;
pub mod file;
pub mod memory;
pub mod okv;
pub mod traits;

pub use comparator::{CompositeComparator, Direction};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use okv::{OkvStore, WriteBatch};
pub use traits::{Storage, StorageInput, StorageOutput};
