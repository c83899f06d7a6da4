//! Blob Storage Abstraction
//!
//! Persistent key/value store for cached compressed track bodies, addressed by
//! track URL.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Persistent store of compressed byte blobs keyed by track URL.
///
/// Abstracts platform-specific storage:
/// - Desktop: a cache directory on disk
/// - Web: Cache Storage / IndexedDB
/// - Mobile: app sandbox cache directory
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::BlobStore;
///
/// async fn warm(store: &dyn BlobStore, url: &str, body: Bytes) -> Result<()> {
///     if !store.has(url).await? {
///         store.put(url, body).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists for `key`.
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Retrieve the blob stored for `key`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `data` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete the blob for `key`. Returns `true` if something was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List all stored keys.
    async fn list(&self) -> Result<Vec<String>>;
}
