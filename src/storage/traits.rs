//! Storage abstraction trait and common types.

use std::io::{Read, Write};

use crate::error::Result;

/// A trait for storage backends that hold the durable files of an ordered
/// store (snapshot and write-ahead log).
///
/// This provides a pluggable interface so tests can run against memory while
/// production uses the file system.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing content.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if missing.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// Rename a file, replacing the target if it exists.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered data and sync it to durable storage.
    fn flush_and_sync(&mut self) -> Result<()>;
}
