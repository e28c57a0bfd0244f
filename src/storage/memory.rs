//! In-memory storage implementation for testing and ephemeral indexes.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::traits::{Storage, StorageInput, StorageOutput};

type FileMap = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// An in-memory storage implementation.
///
/// Useful for tests and for building a throwaway index in memory. The file
/// map is shared between clones, so a "restart" against the same
/// `MemoryStorage` sees everything previously synced.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))?;
        Ok(Box::new(MemoryInput {
            cursor: Cursor::new(data.clone()),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buffer: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let existing = self.files.lock().get(name).cloned().unwrap_or_default();
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buffer: existing,
            files: Arc::clone(&self.files),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }
}

/// Input stream over an in-memory file.
#[derive(Debug)]
struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}

/// Output stream that publishes its buffer into the shared file map on sync.
#[derive(Debug)]
struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: FileMap,
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.files
            .lock()
            .insert(self.name.clone(), self.buffer.clone());
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() -> Result<()> {
        let storage = MemoryStorage::new();
        {
            let mut out = storage.create_output("a.bin")?;
            out.write_all(b"hello")?;
            out.flush_and_sync()?;
        }
        let mut input = storage.open_input("a.bin")?;
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        assert_eq!(data, b"hello");
        assert_eq!(input.size()?, 5);
        Ok(())
    }

    #[test]
    fn test_append_preserves_existing_content() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.create_output("log")?.write_all(b"one")?;
        {
            let mut out = storage.create_output_append("log")?;
            out.write_all(b"two")?;
            out.flush_and_sync()?;
        }
        let mut data = Vec::new();
        storage.open_input("log")?.read_to_end(&mut data)?;
        assert_eq!(data, b"onetwo");
        Ok(())
    }

    #[test]
    fn test_rename_replaces_target() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.create_output("tmp")?.write_all(b"new")?;
        storage.create_output("final")?.write_all(b"old")?;
        storage.rename_file("tmp", "final")?;
        assert!(!storage.file_exists("tmp"));
        let mut data = Vec::new();
        storage.open_input("final")?.read_to_end(&mut data)?;
        assert_eq!(data, b"new");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let storage = MemoryStorage::new();
        assert!(storage.open_input("nope").is_err());
        assert!(!storage.file_exists("nope"));
        assert!(storage.delete_file("nope").is_ok());
    }
}
