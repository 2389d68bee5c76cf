//! Blob store abstraction for data file content.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Byte content addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns a human-readable name for this store.
    fn backend_name(&self) -> &'static str;

    /// Writes `content` at `path`, replacing any previous content.
    async fn write(&self, path: &str, content: Vec<u8>) -> StorageResult<()>;

    /// Reads the content at `path`.
    ///
    /// Fails with `ResourceError::NotFound` when nothing is stored there.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Deletes the content at `path`.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Returns true when content is stored at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Deletes the content at `path` if any, returning whether it existed.
    async fn delete_if_exists(&self, path: &str) -> StorageResult<bool> {
        if self.exists(path).await? {
            self.delete(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
