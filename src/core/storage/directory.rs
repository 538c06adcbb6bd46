//! Virtual index directory over a blob container.
//!
//! Adapts a flat container of named blobs to the directory operations an
//! index engine needs: listing, stat, streams and named locks.

use crate::core::error::{BlobSearchError, Result};
use crate::core::storage::blob::BlobHandle;
use crate::core::storage::container::BlobContainer;
use crate::core::storage::input::{BlobInput, DEFAULT_CHUNK_SIZE};
use crate::core::storage::lock::{LeaseLock, Lock};
use crate::core::storage::output::{BlobOutput, DEFAULT_BUFFER_SIZE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Directory tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectorySettings {
    /// Lease length for locks handed out by `make_lock`
    pub lease_duration: Duration,
    /// Max bytes per ranged read in `BlobInput`
    pub chunk_size: usize,
    /// Local buffer size of `BlobOutput`
    pub buffer_size: usize,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(60),
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Index directory whose files are blobs in one container.
///
/// The lock table is per instance. Two directories (or two processes) on
/// the same container exclude each other only through the store's leases.
pub struct ObjectStoreDirectory {
    container: Arc<dyn BlobContainer>,
    settings: DirectorySettings,
    locks: Mutex<HashMap<String, Arc<LeaseLock>>>,
}

impl std::fmt::Debug for ObjectStoreDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreDirectory")
            .field("container", &self.container.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ObjectStoreDirectory {
    /// Open a directory on `container`, creating the container if needed
    pub async fn open(
        container: Arc<dyn BlobContainer>,
        settings: DirectorySettings,
    ) -> Result<Self> {
        if container.name().trim().is_empty() {
            return Err(BlobSearchError::invalid_argument(
                "container",
                "container name cannot be empty or blank",
            ));
        }
        if settings.lease_duration.is_zero() {
            return Err(BlobSearchError::invalid_argument(
                "lease_duration",
                "lease duration must be greater than zero",
            ));
        }
        if settings.chunk_size == 0 {
            return Err(BlobSearchError::invalid_argument(
                "chunk_size",
                "chunk size must be greater than zero",
            ));
        }

        container.create_if_not_exists().await?;
        tracing::debug!("Opened blob directory on container {}", container.name());

        Ok(Self {
            container,
            settings,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    pub fn container_name(&self) -> &str {
        self.container.name()
    }

    fn blob(&self, name: &str) -> Result<BlobHandle> {
        BlobHandle::new(Arc::clone(&self.container), name)
    }

    /// Names of every file in the directory
    pub async fn list_all(&self) -> Result<Vec<String>> {
        self.container.list().await
    }

    pub async fn file_exists(&self, name: &str) -> Result<bool> {
        self.blob(name)?.exists().await
    }

    /// File length in bytes. A missing file is created empty first, so
    /// this never reports `NotFound`.
    pub async fn file_length(&self, name: &str) -> Result<u64> {
        self.open_input(name).await?.length().await
    }

    /// Modification time in Unix milliseconds
    pub async fn file_modified(&self, name: &str) -> Result<i64> {
        self.blob(name)?.last_modified_millis().await
    }

    /// No-op: the store updates modification times on every write
    pub async fn touch_file(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let existed = self.blob(name)?.delete_if_exists().await?;
        if !existed {
            tracing::debug!("Delete of missing file {} ignored", name);
        }
        Ok(())
    }

    /// Start a fresh file, discarding any previous content
    pub async fn create_output(&self, name: &str) -> Result<BlobOutput> {
        let blob = self.blob(name)?;
        blob.delete_if_exists().await?;
        BlobOutput::create(blob, self.settings.buffer_size).await
    }

    pub async fn open_input(&self, name: &str) -> Result<BlobInput> {
        BlobInput::open(self.blob(name)?, self.settings.chunk_size).await
    }

    /// Lock for `name`, shared by every caller of this directory instance
    pub async fn make_lock(&self, name: &str) -> Result<Arc<LeaseLock>> {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(name) {
            return Ok(Arc::clone(lock));
        }

        let lock = Arc::new(LeaseLock::new(self.blob(name)?, self.settings.lease_duration).await?);
        locks.insert(name.to_string(), Arc::clone(&lock));
        Ok(lock)
    }

    /// Release and forget the lock for `name`, if this instance made one
    pub async fn clear_lock(&self, name: &str) {
        let removed = self.locks.lock().await.remove(name);
        if let Some(lock) = removed {
            lock.release().await;
        }
    }

    /// Number of locks currently cached by this instance
    pub async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::memory::MemoryContainer;

    async fn directory() -> ObjectStoreDirectory {
        let container = Arc::new(MemoryContainer::new("index"));
        ObjectStoreDirectory::open(container, DirectorySettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_validates_settings() {
        let container: Arc<dyn BlobContainer> = Arc::new(MemoryContainer::new("index"));
        let settings = DirectorySettings {
            lease_duration: Duration::ZERO,
            ..DirectorySettings::default()
        };
        let err = ObjectStoreDirectory::open(Arc::clone(&container), settings)
            .await
            .unwrap_err();
        assert!(err.is_precondition());

        let settings = DirectorySettings {
            chunk_size: 0,
            ..DirectorySettings::default()
        };
        assert!(ObjectStoreDirectory::open(container, settings)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_open_creates_container() {
        let container = Arc::new(MemoryContainer::new("index"));
        assert!(container.list().await.is_err());
        ObjectStoreDirectory::open(container.clone(), DirectorySettings::default())
            .await
            .unwrap();
        assert!(container.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_make_lock_is_cached() {
        let dir = directory().await;
        let first = dir.make_lock("write.lock").await.unwrap();
        let second = dir.make_lock("write.lock").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dir.lock_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_lock_releases_and_evicts() {
        let dir = directory().await;
        let lock = dir.make_lock("write.lock").await.unwrap();
        assert!(lock.obtain().await);

        dir.clear_lock("write.lock").await;
        assert!(!lock.is_locked());
        assert_eq!(dir.lock_count().await, 0);

        // Clearing an unknown lock does nothing
        dir.clear_lock("other.lock").await;
    }

    #[tokio::test]
    async fn test_touch_and_delete_missing() {
        let dir = directory().await;
        dir.touch_file("nothing").await.unwrap();
        dir.delete_file("nothing").await.unwrap();
        assert!(!dir.file_exists("nothing").await.unwrap());
    }
}
