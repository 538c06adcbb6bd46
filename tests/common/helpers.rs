// Test helper functions

use async_trait::async_trait;
use blobsearch::core::config::Config;
use blobsearch::core::error::Result;
use blobsearch::core::search::{MemorySearchService, RemoteIndexFactory};
use blobsearch::core::services::{IndexedSearchEngine, Services};
use blobsearch::core::storage::{
    BlobContainer, BlobContent, BlobProperties, MemoryContainer, UploadCondition,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tantivy writer heap used by local indexes in tests
#[allow(dead_code)]
pub const HEAP: usize = 20_000_000;

/// Services on the local provider with temporary storage
#[allow(dead_code)]
pub fn create_local_services() -> (Services, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.search.index_dir = temp_dir.path().to_path_buf();
    config.search.writer_heap_bytes = HEAP;

    (Services::new(config).unwrap(), temp_dir)
}

/// Engine over the remote factory with an in-memory search service
#[allow(dead_code)]
pub fn memory_engine() -> (Arc<MemorySearchService>, IndexedSearchEngine) {
    let service = Arc::new(MemorySearchService::new());
    let factory = Arc::new(RemoteIndexFactory::new(service.clone(), None));
    (service, IndexedSearchEngine::new(factory, 100))
}

/// Container that records every ranged read
#[allow(dead_code)]
pub struct CountingContainer {
    inner: MemoryContainer,
    reads: Mutex<Vec<(u64, usize)>>,
    uploads: AtomicUsize,
    /// Written by another party right after the next download
    interference: Mutex<Option<Bytes>>,
}

#[allow(dead_code)]
impl CountingContainer {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryContainer::new(name),
            reads: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
            interference: Mutex::new(None),
        }
    }

    /// Overwrite the downloaded blob with `data` as soon as the next
    /// download has been served
    pub fn interfere_after_next_download(&self, data: &[u8]) {
        *self.interference.lock().unwrap() = Some(Bytes::copy_from_slice(data));
    }

    /// `(offset, len)` of each ranged read so far
    pub fn reads(&self) -> Vec<(u64, usize)> {
        self.reads.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobContainer for CountingContainer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_if_not_exists(&self) -> Result<()> {
        self.inner.create_if_not_exists().await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }

    async fn exists(&self, blob: &str) -> Result<bool> {
        self.inner.exists(blob).await
    }

    async fn properties(&self, blob: &str) -> Result<BlobProperties> {
        self.inner.properties(blob).await
    }

    async fn download(&self, blob: &str) -> Result<BlobContent> {
        let content = self.inner.download(blob).await?;
        let interference = self.interference.lock().unwrap().take();
        if let Some(data) = interference {
            self.inner
                .upload(blob, data, UploadCondition::Overwrite)
                .await?;
        }
        Ok(content)
    }

    async fn read_range(&self, blob: &str, offset: u64, len: usize) -> Result<Bytes> {
        self.reads.lock().unwrap().push((offset, len));
        self.inner.read_range(blob, offset, len).await
    }

    async fn upload(&self, blob: &str, data: Bytes, condition: UploadCondition) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(blob, data, condition).await
    }

    async fn delete_if_exists(&self, blob: &str) -> Result<bool> {
        self.inner.delete_if_exists(blob).await
    }

    async fn acquire_lease(&self, blob: &str, duration: Duration) -> Result<String> {
        self.inner.acquire_lease(blob, duration).await
    }

    async fn renew_lease(&self, blob: &str, lease_id: &str) -> Result<String> {
        self.inner.renew_lease(blob, lease_id).await
    }

    async fn release_lease(&self, blob: &str, lease_id: &str) -> Result<()> {
        self.inner.release_lease(blob, lease_id).await
    }

    async fn break_lease(&self, blob: &str) -> Result<()> {
        self.inner.break_lease(blob).await
    }
}
