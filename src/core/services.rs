//! Search engine orchestration and the unified service container.
//!
//! [`IndexedSearchEngine`] is the host-facing entry point. It keeps one
//! index per tenant and absorbs transport failures: writes report them
//! as [`IndexingError`]s, reads degrade to empty results or zero.

use crate::core::config::{Config, SearchProvider};
use crate::core::error::{BlobSearchError, Result};
use crate::core::search::{
    IndexFactory, LocalIndexFactory, RelatedSettings, RemoteIndexFactory, ReqwestHttpService,
    RestSearchService,
};
use crate::core::storage::{BlobContainer, ObjectStoreDirectory};
use crate::core::types::{IndexingError, SearchEngineEntry, SearchEngineResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Host-facing search operations
#[async_trait]
pub trait SearchEngineService: Send + Sync {
    /// Index one entry, replacing any document with the same id
    async fn add_post(&self, entry: &SearchEngineEntry) -> Vec<IndexingError>;

    /// Index entries in order. Every failure is reported; none aborts the batch.
    async fn add_posts(&self, entries: &[SearchEngineEntry], optimize: bool)
        -> Vec<IndexingError>;

    /// Delete an entry from whichever index holds it
    async fn remove_post(&self, entry_id: i32);

    async fn search(
        &self,
        query: &str,
        max: usize,
        tenant_id: i32,
        entry_id: Option<i32>,
    ) -> Vec<SearchEngineResult>;

    /// Entries similar to `entry_id`. `Err` only for `NotSupported`.
    async fn related_contents(
        &self,
        entry_id: i32,
        max: usize,
        tenant_id: i32,
    ) -> Result<Vec<SearchEngineResult>>;

    async fn indexed_entry_count(&self, tenant_id: i32) -> u64;

    /// Document count summed over every index
    async fn total_indexed_entry_count(&self) -> u64;
}

/// [`SearchEngineService`] over any [`IndexFactory`]
pub struct IndexedSearchEngine {
    factory: Arc<dyn IndexFactory>,
    max_results: usize,
}

impl IndexedSearchEngine {
    pub fn new(factory: Arc<dyn IndexFactory>, max_results: usize) -> Self {
        Self {
            factory,
            max_results,
        }
    }

    pub fn factory(&self) -> &Arc<dyn IndexFactory> {
        &self.factory
    }

    async fn try_add_post(&self, entry: &SearchEngineEntry) -> Result<Vec<IndexingError>> {
        self.factory.ensure_index_exists(entry.tenant_id).await?;

        if let Some(index) = self.find_index_containing(entry.entry_id).await? {
            self.delete_from(&index, entry.entry_id).await?;
        }

        let client = self.factory.search_client(entry.tenant_id).await?;
        client.upload_entry(entry).await
    }

    /// First index holding `entry_id`, or `None` (with a warning) if no
    /// index does
    async fn find_index_containing(&self, entry_id: i32) -> Result<Option<String>> {
        let names = self.factory.index_names().await?;
        if names.is_empty() {
            tracing::warn!("The index service didn't find any index");
            return Ok(None);
        }

        for name in names {
            let client = self.factory.search_client_for_index(&name).await?;
            if client.contains_entry(entry_id).await? {
                return Ok(Some(name));
            }
        }

        tracing::warn!("Didn't find any index that contains entry {}", entry_id);
        Ok(None)
    }

    async fn delete_from(&self, index: &str, entry_id: i32) -> Result<()> {
        let client = self.factory.search_client_for_index(index).await?;
        client.delete_entries(&[entry_id], true).await?;
        tracing::debug!("Deleted entry {} from {}", entry_id, index);
        Ok(())
    }

    async fn try_search(
        &self,
        query: &str,
        max: usize,
        tenant_id: i32,
        entry_id: Option<i32>,
    ) -> Result<Vec<SearchEngineResult>> {
        self.factory.ensure_index_exists(tenant_id).await?;
        let client = self.factory.search_client(tenant_id).await?;
        client
            .search(query, Some(max.min(self.max_results)), entry_id)
            .await
    }

    async fn try_count(&self, tenant_id: i32) -> Result<u64> {
        self.factory.ensure_index_exists(tenant_id).await?;
        let client = self.factory.search_client(tenant_id).await?;
        client.count_entries().await
    }

    async fn try_total_count(&self) -> Result<u64> {
        let names = self.factory.index_names().await?;
        if names.is_empty() {
            tracing::warn!("The index service didn't find any index");
            return Ok(0);
        }

        let mut total = 0;
        for name in names {
            let client = self.factory.search_client_for_index(&name).await?;
            total += client.count_entries().await?;
        }
        Ok(total)
    }
}

#[async_trait]
impl SearchEngineService for IndexedSearchEngine {
    async fn add_post(&self, entry: &SearchEngineEntry) -> Vec<IndexingError> {
        match self.try_add_post(entry).await {
            Ok(errors) => errors,
            Err(e) => {
                tracing::warn!("Failed to index entry {}: {}", entry.entry_id, e);
                vec![IndexingError::new(entry, e.to_string())]
            }
        }
    }

    async fn add_posts(
        &self,
        entries: &[SearchEngineEntry],
        optimize: bool,
    ) -> Vec<IndexingError> {
        if optimize {
            tracing::debug!("Index optimization is managed by the search backend");
        }

        let mut errors = Vec::new();
        for entry in entries {
            errors.extend(self.add_post(entry).await);
        }

        tracing::info!(
            "Indexed {} entries with {} errors",
            entries.len(),
            errors.len()
        );
        errors
    }

    async fn remove_post(&self, entry_id: i32) {
        let result = match self.find_index_containing(entry_id).await {
            Ok(Some(index)) => self.delete_from(&index, entry_id).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!("Failed to remove entry {}: {}", entry_id, e);
        }
    }

    async fn search(
        &self,
        query: &str,
        max: usize,
        tenant_id: i32,
        entry_id: Option<i32>,
    ) -> Vec<SearchEngineResult> {
        if max == 0 {
            return Vec::new();
        }

        self.try_search(query, max, tenant_id, entry_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Search on tenant {} failed: {}", tenant_id, e);
                Vec::new()
            })
    }

    async fn related_contents(
        &self,
        entry_id: i32,
        max: usize,
        tenant_id: i32,
    ) -> Result<Vec<SearchEngineResult>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let client = match self.factory.search_client(tenant_id).await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("No search client for tenant {}: {}", tenant_id, e);
                return Ok(Vec::new());
            }
        };

        match client
            .search_related_contents(max.min(self.max_results), entry_id)
            .await
        {
            Ok(results) => Ok(results),
            Err(e) if e.is_not_supported() => Err(e),
            Err(e) => {
                tracing::warn!("Related content for entry {} failed: {}", entry_id, e);
                Ok(Vec::new())
            }
        }
    }

    async fn indexed_entry_count(&self, tenant_id: i32) -> u64 {
        self.try_count(tenant_id).await.unwrap_or_else(|e| {
            tracing::warn!("Count on tenant {} failed: {}", tenant_id, e);
            0
        })
    }

    async fn total_indexed_entry_count(&self) -> u64 {
        self.try_total_count().await.unwrap_or_else(|e| {
            tracing::warn!("Total count failed: {}", e);
            0
        })
    }
}

/// Unified services container
#[derive(Clone)]
pub struct Services {
    /// Tenant index lifecycle and clients
    pub factory: Arc<dyn IndexFactory>,

    /// Host-facing search operations
    pub engine: Arc<IndexedSearchEngine>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Create services for the configured provider
    pub fn new(config: Config) -> Result<Self> {
        let factory: Arc<dyn IndexFactory> = match config.search.provider {
            SearchProvider::Local => Arc::new(LocalIndexFactory::on_disk(
                config.search.index_dir.clone(),
                config.search.writer_heap_bytes,
            )),
            SearchProvider::Remote => Arc::new(Self::remote_factory(&config)?),
        };

        Ok(Self::with_factory(config, factory))
    }

    /// Create services around an existing factory
    pub fn with_factory(config: Config, factory: Arc<dyn IndexFactory>) -> Self {
        let engine = Arc::new(IndexedSearchEngine::new(
            Arc::clone(&factory),
            config.search.max_results,
        ));

        Self {
            factory,
            engine,
            config: Arc::new(config),
        }
    }

    fn remote_factory(config: &Config) -> Result<RemoteIndexFactory> {
        let endpoint = config.remote.endpoint.as_deref().unwrap_or_default();
        let api_key = config.remote.api_key.as_deref().unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "api key cannot be empty or blank".to_string(),
            ));
        }

        let service = RestSearchService::new(
            endpoint,
            api_key,
            &config.remote.api_version,
            config.request_timeout(),
        )?;

        let related = if config.remote.related_content {
            Some(RelatedSettings {
                endpoint: service.endpoint().to_string(),
                http: Arc::new(ReqwestHttpService::new(api_key, config.request_timeout())?),
                preview_api_version: Some(config.remote.preview_api_version.clone()),
            })
        } else {
            None
        };

        Ok(RemoteIndexFactory::new(Arc::new(service), related))
    }

    /// Open the index directory on the configured container.
    ///
    /// `connect` binds a container name to a blob store backend.
    pub async fn open_directory<F>(&self, connect: F) -> Result<ObjectStoreDirectory>
    where
        F: FnOnce(&str) -> Arc<dyn BlobContainer>,
    {
        let container = connect(&self.config.storage.container);
        ObjectStoreDirectory::open(container, self.config.directory_settings()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search::MemorySearchService;
    use crate::core::storage::MemoryContainer;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(tenant_id: i32, entry_id: i32, title: &str) -> SearchEngineEntry {
        SearchEngineEntry {
            tenant_id,
            tenant_name: format!("Tenant {tenant_id}"),
            body: format!("{title} body"),
            group_id: 1,
            entry_id,
            is_published: true,
            entry_name: Some(format!("post-{entry_id}")),
            publish_date: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            tags: "rust".to_string(),
            title: title.to_string(),
        }
    }

    fn remote_engine() -> (Arc<MemorySearchService>, IndexedSearchEngine) {
        let service = Arc::new(MemorySearchService::new());
        let factory = Arc::new(RemoteIndexFactory::new(service.clone(), None));
        (service, IndexedSearchEngine::new(factory, 100))
    }

    #[tokio::test]
    async fn test_add_post_creates_tenant_index() {
        let (service, engine) = remote_engine();
        assert!(engine.add_post(&entry(7, 1, "Hello")).await.is_empty());
        assert_eq!(service.documents("index-7").len(), 1);
        assert_eq!(engine.indexed_entry_count(7).await, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_indexing_error() {
        let (service, engine) = remote_engine();
        service.set_unavailable(Some("connection refused"));

        let errors = engine.add_post(&entry(7, 1, "Hello")).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entry_id(), 1);
        assert!(errors[0].message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_reads_degrade_when_unavailable() {
        let (service, engine) = remote_engine();
        engine.add_post(&entry(7, 1, "Hello")).await;
        service.set_unavailable(Some("timeout"));

        assert!(engine.search("hello", 10, 7, None).await.is_empty());
        assert_eq!(engine.indexed_entry_count(7).await, 0);
        assert_eq!(engine.total_indexed_entry_count().await, 0);
        engine.remove_post(1).await;
    }

    #[tokio::test]
    async fn test_search_zero_max_is_empty() {
        let (_service, engine) = remote_engine();
        engine.add_post(&entry(7, 1, "Hello")).await;
        assert!(engine.search("hello", 0, 7, None).await.is_empty());
        assert_eq!(engine.search("hello", 5, 7, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_related_contents_not_supported_locally() {
        let factory = Arc::new(LocalIndexFactory::in_memory(20_000_000));
        let engine = IndexedSearchEngine::new(factory, 100);
        engine.add_post(&entry(2, 1, "Hello")).await;

        let err = engine.related_contents(1, 5, 2).await.unwrap_err();
        assert!(err.is_not_supported());
    }

    #[tokio::test]
    async fn test_services_local_provider() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.search.index_dir = temp_dir.path().to_path_buf();

        let services = Services::new(config).unwrap();
        assert!(services.engine.add_post(&entry(3, 9, "Disk")).await.is_empty());
        assert_eq!(services.factory.index_names().await.unwrap(), vec!["index-3"]);

        let cloned = services.clone();
        assert!(Arc::ptr_eq(&services.engine, &cloned.engine));
        assert!(Arc::ptr_eq(&services.config, &cloned.config));
    }

    #[test]
    fn test_services_remote_requires_key() {
        let mut config = Config::default();
        config.search.provider = SearchProvider::Remote;
        config.remote.endpoint = Some("https://example.search.windows.net".to_string());
        assert!(Services::new(config.clone()).is_err());

        config.remote.api_key = Some("key".to_string());
        assert!(Services::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_open_directory_uses_config() {
        let mut config = Config::default();
        config.storage.chunk_size = 128;
        config.storage.container = "blog-segments".to_string();
        let services =
            Services::with_factory(config, Arc::new(LocalIndexFactory::in_memory(20_000_000)));

        let directory = services
            .open_directory(|name| Arc::new(MemoryContainer::new(name)) as Arc<dyn BlobContainer>)
            .await
            .unwrap();
        assert_eq!(directory.container_name(), "blog-segments");
        assert_eq!(directory.settings().chunk_size, 128);
    }
}
