//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage root is missing and could not be created
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file contents
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Writes replace any existing object under the same key as a whole; readers
/// never observe a partially written file.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key` and return the filesystem path it landed at
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<PathBuf>;

    /// Stream an object in chunks
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;
}
