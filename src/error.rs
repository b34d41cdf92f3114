//! Top-level error type.
//!
//! Every public operation on [`crate::store::PersistentStore`] returns
//! `Result<T, Error>`. Internal modules keep their own precise error
//! enums (`WalError`, `PageError`, `ManifestError`, ...) and this type
//! folds them into the six categories the storage engine promises to
//! its callers.

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::page::PageError;
use crate::wal::WalError;

/// The six error categories the engine surfaces to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input reaching the core through a query operator.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An unknown node id, string, or primary key was requested.
    ///
    /// Reads never raise this on their own — callers receive an absent
    /// result (`None` / empty iterator). This variant exists for
    /// maintenance operations (`dump`, `repairPage`) that are handed an
    /// explicit primary and must report it doesn't exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O failure, CRC mismatch, truncated page, missing manifest, or
    /// corrupt header. Fatal for the current operation; the store
    /// becomes read-only until `repair` succeeds.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lock contention on open, or an attempt to open a locked database
    /// for reading while the WAL holds unflushed data.
    #[error("busy: {0}")]
    Busy(String),

    /// Unsupported version in the file header, WAL header, or manifest.
    #[error("incompatible version: {0}")]
    Compatibility(String),

    /// A write was attempted inside a snapshot-only (`withSnapshot`) path.
    #[error("readonly violation: {0}")]
    ReadonlyViolation(String),
}

/// Aggregates the storage-layer error types that all surface as
/// [`Error::Storage`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("encoding error: {0}")]
    Encoding(#[from] crate::encoding::EncodingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<WalError> for Error {
    fn from(e: WalError) -> Self {
        Error::Storage(StorageError::Wal(e))
    }
}

impl From<PageError> for Error {
    fn from(e: PageError) -> Self {
        Error::Storage(StorageError::Page(e))
    }
}

impl From<ManifestError> for Error {
    fn from(e: ManifestError) -> Self {
        Error::Storage(StorageError::Manifest(e))
    }
}

impl From<crate::encoding::EncodingError> for Error {
    fn from(e: crate::encoding::EncodingError) -> Self {
        Error::Storage(StorageError::Encoding(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(e))
    }
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;
