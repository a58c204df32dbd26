/// Core traits for Bucket Mirror
use crate::error::Result;
use crate::types::{BucketUri, ObjectInfo};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use tokio::io::AsyncRead;

/// Object content as a stream of chunks
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Bucket listing, produced lazily so very large buckets never sit in memory
pub type ListStream<'a> = BoxStream<'a, Result<ObjectInfo>>;

/// Object content handed to a provider for upload
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Object store client for one bucket
///
/// Implementers wrap a single provider (S3, GCS, a local directory...). The
/// sync engine selects one implementation per bucket up front and only ever
/// talks to it through this trait.
///
/// Failures must be reported with the `StoreError` variant that matches
/// them: `NotFound` for absent objects and `Transient` for connectivity
/// problems are handled specially by callers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Identifier of the bucket this client serves
    fn bucket(&self) -> &BucketUri;

    /// List every object in the bucket with its fingerprint
    fn list(&self) -> ListStream<'_>;

    /// Open an object for reading
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no object exists at `path`
    async fn get(&self, path: &str) -> Result<ByteStream>;

    /// Create or overwrite the object at `path` with `length` bytes from `body`
    async fn put(&self, path: &str, body: ByteReader, length: u64) -> Result<()>;

    /// Remove the object at `path`
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no object exists at `path`
    async fn delete(&self, path: &str) -> Result<()>;
}
