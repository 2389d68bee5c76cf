//! Blob store over [`object_store`].

use std::fmt::Debug;
use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::config::BlobConfig;
use crate::core::BlobStore;
use crate::error::{BackendError, StorageError, StorageResult};

/// Data file content kept in an [`ObjectStore`].
#[derive(Clone)]
pub struct ObjectStoreBlobs {
    store: Arc<dyn ObjectStore>,
    backend_name: &'static str,
}

impl Debug for ObjectStoreBlobs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBlobs")
            .field("store", &self.store.to_string())
            .finish()
    }
}

impl ObjectStoreBlobs {
    /// Wraps an existing object store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            backend_name: "object-store",
        }
    }

    /// Creates a blob store held in memory.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            backend_name: "memory-blobs",
        }
    }

    /// Creates a blob store rooted at a local directory, creating it if needed.
    pub fn local(root: impl AsRef<FsPath>) -> StorageResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| BackendError::StorageIo {
            path: root.display().to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| io_error(&root.display().to_string(), e))?;
        Ok(Self {
            store: Arc::new(store),
            backend_name: "local-blobs",
        })
    }

    /// Creates the blob store described by the configuration: a local
    /// directory when `root` is set, memory otherwise.
    pub fn from_config(config: &BlobConfig) -> StorageResult<Self> {
        match &config.root {
            Some(root) => Self::local(root),
            None => Ok(Self::in_memory()),
        }
    }

    fn path(&self, path: &str) -> StorageResult<Path> {
        Path::parse(path).map_err(|e| {
            BackendError::StorageIo {
                path: path.to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            }
            .into()
        })
    }
}

fn io_error(path: &str, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::from(err),
        other => BackendError::StorageIo {
            path: path.to_string(),
            message: other.to_string(),
            source: Some(Box::new(other)),
        }
        .into(),
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobs {
    fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    async fn write(&self, path: &str, content: Vec<u8>) -> StorageResult<()> {
        let location = self.path(path)?;
        let size = content.len();
        self.store
            .put(&location, PutPayload::from(content))
            .await
            .map_err(|e| io_error(path, e))?;
        tracing::debug!(path, size, "wrote blob");
        Ok(())
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let location = self.path(path)?;
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| io_error(path, e))?;
        let bytes = result.bytes().await.map_err(|e| io_error(path, e))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = self.path(path)?;
        self.store
            .delete(&location)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = self.path(path)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let blobs = ObjectStoreBlobs::in_memory();
        blobs.write("datafile/abc", b"content".to_vec()).await.unwrap();
        assert!(blobs.exists("datafile/abc").await.unwrap());
        assert_eq!(blobs.read("datafile/abc").await.unwrap(), b"content");

        assert!(blobs.delete_if_exists("datafile/abc").await.unwrap());
        assert!(!blobs.exists("datafile/abc").await.unwrap());
        assert!(!blobs.delete_if_exists("datafile/abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let blobs = ObjectStoreBlobs::in_memory();
        let err = blobs.read("datafile/missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = ObjectStoreBlobs::local(dir.path().join("files")).unwrap();
        blobs.write("datafile/xyz", vec![1, 2, 3]).await.unwrap();
        assert!(dir.path().join("files/datafile/xyz").exists());
        assert_eq!(blobs.read("datafile/xyz").await.unwrap(), vec![1, 2, 3]);
    }
}
