//! Per-tenant index lifecycle and client caching.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::backend::SearchIndexService;
use crate::core::search::client::{RemoteSearchClient, SearchClient};
use crate::core::search::document::{index_name, tenant_from_index_name, IndexDefinition};
use crate::core::search::http::HttpService;
use crate::core::search::local::LocalSearchClient;
use crate::core::search::related::RelatedContentClient;
use crate::core::storage::{IndexCatalog, TenantIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Resolves tenants to indexes and clients
#[async_trait]
pub trait IndexFactory: Send + Sync {
    /// Create the tenant's index or update its schema; idempotent
    async fn ensure_index_exists(&self, tenant_id: i32) -> Result<()>;

    /// Names of every index the provider knows about
    async fn index_names(&self) -> Result<Vec<String>>;

    /// Cached client for a tenant's index
    async fn search_client(&self, tenant_id: i32) -> Result<Arc<dyn SearchClient>>;

    /// Cached client for an index by name
    async fn search_client_for_index(&self, index_name: &str) -> Result<Arc<dyn SearchClient>>;
}

/// Map of clients keyed by index name.
///
/// Lookups take the read lock. Population re-checks under the write lock,
/// so concurrent first access builds exactly one client.
pub struct ClientCache<T: ?Sized> {
    clients: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: ?Sized> Default for ClientCache<T> {
    fn default() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized> ClientCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<T>> {
        self.clients.read().await.get(key).cloned()
    }

    /// Cached value for `key`, or the result of `create` if there is none.
    /// A failed `create` caches nothing.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: &str, create: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>>,
    {
        if let Some(client) = self.get(key).await {
            return Ok(client);
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(key) {
            return Ok(Arc::clone(client));
        }

        let client = create().await?;
        clients.insert(key.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.clients.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Settings for the preview related-content endpoint
#[derive(Clone)]
pub struct RelatedSettings {
    pub endpoint: String,
    pub http: Arc<dyn HttpService>,
    pub preview_api_version: Option<String>,
}

/// [`IndexFactory`] over a remote search service
pub struct RemoteIndexFactory {
    service: Arc<dyn SearchIndexService>,
    related: Option<RelatedSettings>,
    clients: ClientCache<dyn SearchClient>,
}

impl RemoteIndexFactory {
    /// Without `related`, clients answer related-content queries with
    /// `NotSupported`
    pub fn new(service: Arc<dyn SearchIndexService>, related: Option<RelatedSettings>) -> Self {
        Self {
            service,
            related,
            clients: ClientCache::new(),
        }
    }

    pub fn cached_clients(&self) -> &ClientCache<dyn SearchClient> {
        &self.clients
    }

    fn build_client(&self, name: &str) -> Result<Arc<dyn SearchClient>> {
        let related = match &self.related {
            Some(settings) => Some(RelatedContentClient::new(
                &settings.endpoint,
                name,
                Arc::clone(&settings.http),
                settings.preview_api_version.as_deref(),
            )?),
            None => None,
        };

        let client = RemoteSearchClient::new(
            Arc::clone(&self.service),
            name,
            tenant_from_index_name(name),
            related,
        )?;
        tracing::debug!("Created search client for {}", name);
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl IndexFactory for RemoteIndexFactory {
    async fn ensure_index_exists(&self, tenant_id: i32) -> Result<()> {
        self.service
            .create_or_update_index(&IndexDefinition::for_tenant(tenant_id))
            .await
    }

    async fn index_names(&self) -> Result<Vec<String>> {
        self.service.list_indexes().await
    }

    async fn search_client(&self, tenant_id: i32) -> Result<Arc<dyn SearchClient>> {
        self.search_client_for_index(&index_name(tenant_id)).await
    }

    async fn search_client_for_index(&self, index_name: &str) -> Result<Arc<dyn SearchClient>> {
        self.clients
            .get_or_try_insert_with(index_name, || async { self.build_client(index_name) })
            .await
    }
}

/// [`IndexFactory`] over local Tantivy indexes, on disk or in memory
pub struct LocalIndexFactory {
    catalog: Option<IndexCatalog>,
    writer_heap_bytes: usize,
    clients: ClientCache<LocalSearchClient>,
}

impl LocalIndexFactory {
    /// Indexes persisted under `root`
    pub fn on_disk(root: PathBuf, writer_heap_bytes: usize) -> Self {
        Self {
            catalog: Some(IndexCatalog::new(root, writer_heap_bytes)),
            writer_heap_bytes,
            clients: ClientCache::new(),
        }
    }

    /// Indexes that live as long as the factory
    pub fn in_memory(writer_heap_bytes: usize) -> Self {
        Self {
            catalog: None,
            writer_heap_bytes,
            clients: ClientCache::new(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.catalog.is_some()
    }

    async fn client(&self, name: &str, create: bool) -> Result<Arc<LocalSearchClient>> {
        self.clients
            .get_or_try_insert_with(name, || async {
                let index = match &self.catalog {
                    Some(catalog) if create => catalog.ensure(name)?,
                    Some(catalog) => catalog.open(name)?,
                    None if create => TenantIndex::create_in_ram(
                        &IndexDefinition::for_index(name),
                        self.writer_heap_bytes,
                    )?,
                    None => return Err(BlobSearchError::IndexNotFound(name.to_string())),
                };
                Ok(Arc::new(LocalSearchClient::new(
                    name,
                    index,
                    self.catalog.clone(),
                )))
            })
            .await
    }
}

#[async_trait]
impl IndexFactory for LocalIndexFactory {
    async fn ensure_index_exists(&self, tenant_id: i32) -> Result<()> {
        self.client(&index_name(tenant_id), true).await?;
        Ok(())
    }

    async fn index_names(&self) -> Result<Vec<String>> {
        match &self.catalog {
            Some(catalog) => Ok(catalog.list()?.into_iter().map(|m| m.name).collect()),
            None => Ok(self.clients.keys().await),
        }
    }

    async fn search_client(&self, tenant_id: i32) -> Result<Arc<dyn SearchClient>> {
        let client = self.client(&index_name(tenant_id), true).await?;
        Ok(client)
    }

    async fn search_client_for_index(&self, index_name: &str) -> Result<Arc<dyn SearchClient>> {
        let client = self.client(index_name, false).await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search::memory::MemorySearchService;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const HEAP: usize = 20_000_000;

    #[tokio::test]
    async fn test_cache_builds_once() {
        let cache: ClientCache<String> = ClientCache::new();
        let built = AtomicUsize::new(0);

        let first = cache
            .get_or_try_insert_with("a", || async {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("first".to_string()))
            })
            .await
            .unwrap();
        let second = cache
            .get_or_try_insert_with("a", || async {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("second".to_string()))
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_is_not_cached() {
        let cache: ClientCache<String> = ClientCache::new();
        let result = cache
            .get_or_try_insert_with("a", || async {
                Err(BlobSearchError::Transport("down".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remote_factory_caches_per_index() {
        let service = Arc::new(MemorySearchService::new());
        let factory = RemoteIndexFactory::new(service.clone(), None);

        factory.ensure_index_exists(1).await.unwrap();
        factory.ensure_index_exists(1).await.unwrap();
        assert_eq!(factory.index_names().await.unwrap(), vec!["index-1"]);
        assert_eq!(service.definition("index-1").unwrap(), IndexDefinition::for_tenant(1));

        let a = factory.search_client(1).await.unwrap();
        let b = factory.search_client_for_index("index-1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.index_name(), "index-1");
        assert_eq!(factory.cached_clients().len().await, 1);
    }

    #[tokio::test]
    async fn test_local_factory_in_memory() {
        let factory = LocalIndexFactory::in_memory(HEAP);
        assert!(factory.index_names().await.unwrap().is_empty());
        assert!(factory
            .search_client_for_index("index-2")
            .await
            .err()
            .unwrap()
            .is_not_found());

        factory.ensure_index_exists(2).await.unwrap();
        factory.ensure_index_exists(2).await.unwrap();
        assert_eq!(factory.index_names().await.unwrap(), vec!["index-2"]);

        let a = factory.search_client(2).await.unwrap();
        let b = factory.search_client_for_index("index-2").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_local_factory_on_disk_lists_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let factory = LocalIndexFactory::on_disk(temp_dir.path().to_path_buf(), HEAP);
        assert!(factory.is_persistent());

        factory.ensure_index_exists(5).await.unwrap();
        assert_eq!(factory.index_names().await.unwrap(), vec!["index-5"]);
        assert!(temp_dir.path().join("indexes/index-5/meta.json").exists());
    }
}
