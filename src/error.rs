//! Error types for the sedge library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`SedgeError`] enum. Storage I/O failures are propagated to the caller
//! unchanged; retry policy belongs to the caller.
//!
//! # Examples
//!
//! ```
//! use sedge::error::{Result, SedgeError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SedgeError::not_found("post 42 has no index entry"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for sedge operations.
#[derive(Error, Debug)]
pub enum SedgeError {
    /// I/O errors (file operations, sync failures, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage-related errors (corrupt snapshot, comparator mismatch, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A requested entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors
    #[error("Query error: {0}")]
    Query(String),

    /// Analysis-related errors (tokenization)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SedgeError.
pub type Result<T> = std::result::Result<T, SedgeError>;

impl SedgeError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        SedgeError::Storage(msg.into())
    }

    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        SedgeError::NotFound(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SedgeError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SedgeError::Query(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        SedgeError::Analysis(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        SedgeError::SerializationError(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SedgeError::Other(msg.into())
    }

    /// Whether this error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SedgeError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SedgeError::storage("Test storage error");
        assert_eq!(error.to_string(), "Storage error: Test storage error");

        let error = SedgeError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = SedgeError::not_found("missing entry");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sedge_error = SedgeError::from(io_error);

        match sedge_error {
            SedgeError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
