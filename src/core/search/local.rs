//! [`SearchClient`] over a local Tantivy index.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::client::SearchClient;
use crate::core::search::document::{DocumentFilter, IndexDocument};
use crate::core::storage::{IndexCatalog, TenantIndex};
use crate::core::types::{IndexingError, SearchEngineEntry, SearchEngineResult};
use async_trait::async_trait;

/// Client for one tenant index stored locally
#[derive(Debug)]
pub struct LocalSearchClient {
    index_name: String,
    index: TenantIndex,
    /// Present for on-disk indexes; updated after every write
    catalog: Option<IndexCatalog>,
}

impl LocalSearchClient {
    pub fn new(index_name: &str, index: TenantIndex, catalog: Option<IndexCatalog>) -> Self {
        Self {
            index_name: index_name.to_string(),
            index,
            catalog,
        }
    }

    fn touch(&self) {
        if let Some(catalog) = &self.catalog {
            if let Err(e) = catalog.touch(&self.index_name) {
                tracing::warn!("Failed to update metadata of {}: {}", self.index_name, e);
            }
        }
    }
}

#[async_trait]
impl SearchClient for LocalSearchClient {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn contains_entry(&self, entry_id: i32) -> Result<bool> {
        self.index.contains(&entry_id.to_string())
    }

    async fn count_entries(&self) -> Result<u64> {
        Ok(self.index.count())
    }

    async fn delete_entries(&self, entry_ids: &[i32], throw_on_any_error: bool) -> Result<()> {
        let keys: Vec<String> = entry_ids.iter().map(|id| id.to_string()).collect();
        match self.index.delete(&keys) {
            Ok(()) => {
                self.touch();
                Ok(())
            }
            Err(e) if throw_on_any_error => Err(e),
            Err(e) => {
                tracing::warn!("Failed to delete entries from {}: {}", self.index_name, e);
                Ok(())
            }
        }
    }

    async fn search(
        &self,
        query: &str,
        size: Option<usize>,
        entry_id: Option<i32>,
    ) -> Result<Vec<SearchEngineResult>> {
        let filter = entry_id.map(DocumentFilter::entry);
        let hits = self.index.search(query, filter.as_ref(), size)?;
        Ok(hits
            .iter()
            .filter_map(|(score, document)| document.to_result(*score))
            .collect())
    }

    async fn upload_entry(&self, entry: &SearchEngineEntry) -> Result<Vec<IndexingError>> {
        self.index.upsert(&IndexDocument::from(entry))?;
        self.touch();
        Ok(Vec::new())
    }

    async fn search_related_contents(
        &self,
        _size: usize,
        _entry_id: i32,
    ) -> Result<Vec<SearchEngineResult>> {
        Err(BlobSearchError::NotSupported(
            "related content is not available for local indexes".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search::document::IndexDefinition;
    use chrono::{TimeZone, Utc};

    fn entry(entry_id: i32, title: &str) -> SearchEngineEntry {
        SearchEngineEntry {
            tenant_id: 3,
            tenant_name: "Site".to_string(),
            body: format!("{title} body text"),
            group_id: 1,
            entry_id,
            is_published: true,
            entry_name: None,
            publish_date: Utc.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap(),
            tags: String::new(),
            title: title.to_string(),
        }
    }

    fn client() -> LocalSearchClient {
        let index = TenantIndex::create_in_ram(&IndexDefinition::for_tenant(3), 20_000_000).unwrap();
        LocalSearchClient::new("index-3", index, None)
    }

    #[tokio::test]
    async fn test_upload_search_delete() {
        let client = client();
        assert!(client.upload_entry(&entry(1, "Lifetimes")).await.unwrap().is_empty());
        assert!(client.upload_entry(&entry(2, "Traits")).await.unwrap().is_empty());

        let results = client.search("lifetimes", Some(10), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry_id, 1);
        assert_eq!(results[0].entry_name, "");

        assert!(client.contains_entry(2).await.unwrap());
        client.delete_entries(&[2], true).await.unwrap();
        assert!(!client.contains_entry(2).await.unwrap());
        assert_eq!(client.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_search_is_empty() {
        let client = client();
        assert!(client.search("*", None, None).await.unwrap().is_empty());
        assert!(client.search("anything", Some(5), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_related_content_not_supported() {
        let client = client();
        let err = client.search_related_contents(5, 1).await.unwrap_err();
        assert!(err.is_not_supported());
    }
}
