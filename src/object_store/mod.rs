mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Chunked byte payload flowing into or out of a backend.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Wrap a fully buffered payload as a single-chunk stream.
pub fn stream_from_bytes(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over byte-storage backends.
/// Keys are derived from record ids -- the raw blobs are meaningless without
/// the metadata index.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a full payload under `key`. `len` is the declared content
    /// length; backends that must announce it up front rely on it.
    async fn put(&self, key: &str, data: ByteStream, len: u64) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<ByteStream, ObjectStoreError>;
    /// Deleting an absent object is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}
