//! Tenant-scoped search client contract and its remote implementation.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::backend::{QueryRequest, SearchIndexService};
use crate::core::search::document::{DocumentFilter, IndexDocument, KEY_FIELD};
use crate::core::search::related::RelatedContentClient;
use crate::core::types::{IndexingError, SearchEngineEntry, SearchEngineResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations on one tenant's index
#[async_trait]
pub trait SearchClient: Send + Sync {
    fn index_name(&self) -> &str;

    async fn contains_entry(&self, entry_id: i32) -> Result<bool>;

    async fn count_entries(&self) -> Result<u64>;

    /// Delete documents by entry id. With `throw_on_any_error` any failed
    /// key fails the call; otherwise failures are only logged.
    async fn delete_entries(&self, entry_ids: &[i32], throw_on_any_error: bool) -> Result<()>;

    /// Full-text search. `"*"` matches everything; `entry_id` restricts
    /// the search to one document; `size` caps the number of hits.
    async fn search(
        &self,
        query: &str,
        size: Option<usize>,
        entry_id: Option<i32>,
    ) -> Result<Vec<SearchEngineResult>>;

    /// Upsert one entry. Per-document failures come back as
    /// [`IndexingError`]s; `Err` means the call itself failed.
    async fn upload_entry(&self, entry: &SearchEngineEntry) -> Result<Vec<IndexingError>>;

    /// Entries similar to `entry_id`
    async fn search_related_contents(
        &self,
        size: usize,
        entry_id: i32,
    ) -> Result<Vec<SearchEngineResult>>;
}

/// [`SearchClient`] for one index of a remote search service
pub struct RemoteSearchClient {
    service: Arc<dyn SearchIndexService>,
    index_name: String,
    /// Tenant encoded in the index name, if it follows the convention
    tenant_id: Option<i32>,
    related: Option<RelatedContentClient>,
}

impl std::fmt::Debug for RemoteSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSearchClient")
            .field("index_name", &self.index_name)
            .field("tenant_id", &self.tenant_id)
            .field("related", &self.related.is_some())
            .finish()
    }
}

impl RemoteSearchClient {
    pub fn new(
        service: Arc<dyn SearchIndexService>,
        index_name: &str,
        tenant_id: Option<i32>,
        related: Option<RelatedContentClient>,
    ) -> Result<Self> {
        if index_name.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "index name cannot be empty or blank".to_string(),
            ));
        }

        Ok(Self {
            service,
            index_name: index_name.to_string(),
            tenant_id,
            related,
        })
    }

    pub fn tenant_id(&self) -> Option<i32> {
        self.tenant_id
    }
}

#[async_trait]
impl SearchClient for RemoteSearchClient {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn contains_entry(&self, entry_id: i32) -> Result<bool> {
        let request = QueryRequest::match_all().with_filter(DocumentFilter::entry(entry_id));
        let response = self.service.query(&self.index_name, &request).await?;
        Ok(response
            .and_then(|r| r.total_count)
            .is_some_and(|count| count > 0))
    }

    async fn count_entries(&self) -> Result<u64> {
        self.service.document_count(&self.index_name).await
    }

    async fn delete_entries(&self, entry_ids: &[i32], throw_on_any_error: bool) -> Result<()> {
        let keys: Vec<String> = entry_ids.iter().map(|id| id.to_string()).collect();
        let statuses = self
            .service
            .delete_documents(&self.index_name, KEY_FIELD, &keys, throw_on_any_error)
            .await?;

        for status in statuses.iter().filter(|s| !s.is_success()) {
            tracing::warn!(
                "Failed to delete document {} from {}: {}",
                status.key,
                self.index_name,
                status.message()
            );
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        size: Option<usize>,
        entry_id: Option<i32>,
    ) -> Result<Vec<SearchEngineResult>> {
        let mut request = QueryRequest::new(query);
        if let Some(entry_id) = entry_id {
            request = request.with_filter(DocumentFilter::entry(entry_id));
        }
        if let Some(size) = size {
            request = request.with_top(size);
        }

        let Some(response) = self.service.query(&self.index_name, &request).await? else {
            tracing::warn!(
                "Received null response from index search on {}",
                self.index_name
            );
            return Ok(Vec::new());
        };

        if response.total_count == Some(0) {
            return Ok(Vec::new());
        }

        Ok(response
            .results
            .iter()
            .filter_map(|hit| {
                let score = hit.score.map(|s| s as f32).unwrap_or(0.0);
                hit.document.to_result(score)
            })
            .collect())
    }

    async fn upload_entry(&self, entry: &SearchEngineEntry) -> Result<Vec<IndexingError>> {
        let document = IndexDocument::from(entry);
        let statuses = self
            .service
            .upload_documents(&self.index_name, std::slice::from_ref(&document))
            .await?;

        if statuses.is_empty() {
            tracing::warn!(
                "Received empty response from upload to {}, not sure if request was successful",
                self.index_name
            );
        }

        Ok(statuses
            .iter()
            .filter(|s| !s.is_success())
            .map(|s| IndexingError::new(entry, s.message()))
            .collect())
    }

    async fn search_related_contents(
        &self,
        size: usize,
        entry_id: i32,
    ) -> Result<Vec<SearchEngineResult>> {
        match (&self.related, self.tenant_id) {
            (Some(related), Some(tenant_id)) => Ok(related
                .search_related_contents(tenant_id, size, entry_id)
                .await),
            _ => Err(BlobSearchError::NotSupported(format!(
                "related content is not configured for {}",
                self.index_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search::backend::SearchIndexService;
    use crate::core::search::document::IndexDefinition;
    use crate::core::search::memory::MemorySearchService;
    use chrono::{TimeZone, Utc};

    fn entry(entry_id: i32, body: &str) -> SearchEngineEntry {
        SearchEngineEntry {
            tenant_id: 1,
            tenant_name: "Blog".to_string(),
            body: body.to_string(),
            group_id: 1,
            entry_id,
            is_published: true,
            entry_name: Some(format!("entry-{entry_id}")),
            publish_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            tags: "tag".to_string(),
            title: format!("Entry {entry_id}"),
        }
    }

    async fn client() -> (Arc<MemorySearchService>, RemoteSearchClient) {
        let service = Arc::new(MemorySearchService::new());
        service
            .create_or_update_index(&IndexDefinition::for_tenant(1))
            .await
            .unwrap();
        let client = RemoteSearchClient::new(service.clone(), "index-1", Some(1), None).unwrap();
        (service, client)
    }

    #[tokio::test]
    async fn test_upload_and_contains() {
        let (_service, client) = client().await;
        assert!(!client.contains_entry(5).await.unwrap());

        let errors = client.upload_entry(&entry(5, "hello")).await.unwrap();
        assert!(errors.is_empty());
        assert!(client.contains_entry(5).await.unwrap());
        assert_eq!(client.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_upload_becomes_indexing_error() {
        let (service, client) = client().await;
        service.reject_document("5", "Document is too large");

        let errors = client.upload_entry(&entry(5, "hello")).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entry_id(), 5);
        assert_eq!(errors[0].message, "Document is too large");
    }

    #[tokio::test]
    async fn test_search_results() {
        let (_service, client) = client().await;
        client.upload_entry(&entry(1, "rust tips")).await.unwrap();
        client.upload_entry(&entry(2, "go tips")).await.unwrap();

        let results = client.search("rust", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry_id, 1);
        assert_eq!(results[0].entry_name, "entry-1");
        assert!(results[0].score > 0.0);

        let results = client.search("*", Some(10), Some(2)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry_id, 2);

        assert!(client.search("python", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_response_is_empty() {
        let (service, client) = client().await;
        client.upload_entry(&entry(1, "rust")).await.unwrap();
        service.set_empty_responses(true);
        assert!(client.search("rust", None, None).await.unwrap().is_empty());
        assert!(!client.contains_entry(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_entries() {
        let (_service, client) = client().await;
        client.upload_entry(&entry(1, "a")).await.unwrap();
        client.delete_entries(&[1, 99], true).await.unwrap();
        assert_eq!(client.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_related_without_endpoint_not_supported() {
        let (_service, client) = client().await;
        let err = client.search_related_contents(5, 1).await.unwrap_err();
        assert!(err.is_not_supported());
    }
}
