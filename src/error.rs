//! Error taxonomy for storage operations.
//!
//! Two kinds only: the target could not be found, or I/O failed partway
//! through. No retries happen at this layer - retry policy belongs to the
//! caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the storage accessor.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Neither the primary path nor its `.gz` fallback could be opened for
    /// reading, or the target directory for a listing does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Path as requested by the caller (before gzip fallback).
        path: PathBuf,
    },

    /// An I/O failure: write destination unopenable, a socket write failed
    /// or came up short mid-stream, or file content was not valid UTF-8 for
    /// a text read.
    ///
    /// For streamed reads this may mean header bytes are already on the
    /// wire; callers must treat the response as possibly corrupted.
    #[error("io failure on {path}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is the not-found variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
