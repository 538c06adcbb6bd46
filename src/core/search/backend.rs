//! Remote search index service contract.
//!
//! The operations a cloud search service exposes for one account:
//! index management, document writes and queries. Request and response
//! types follow the service's JSON wire format.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::document::{DocumentFilter, IndexDefinition, IndexDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-document outcome of an upload or delete batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStatus {
    pub key: String,
    #[serde(rename = "status")]
    pub succeeded: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    pub status_code: u16,
}

impl IndexingStatus {
    pub fn ok(key: impl Into<String>, status_code: u16) -> Self {
        Self {
            key: key.into(),
            succeeded: true,
            error_message: None,
            status_code,
        }
    }

    pub fn failed(key: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            succeeded: false,
            error_message: Some(message.into()),
            status_code,
        }
    }

    /// Only 200 and 201 count as a successful write
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, 200 | 201)
    }

    pub fn message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| format!("document '{}' failed with status {}", self.key, self.status_code))
    }
}

/// Fail with the first failed status when `throw_on_any_error` is set
pub fn check_statuses(
    statuses: Vec<IndexingStatus>,
    throw_on_any_error: bool,
) -> Result<Vec<IndexingStatus>> {
    if throw_on_any_error {
        if let Some(failed) = statuses.iter().find(|s| !s.is_success()) {
            return Err(BlobSearchError::Indexing(failed.message()));
        }
    }
    Ok(statuses)
}

/// A full-text query against one index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Query text; `*` matches every document
    pub search: String,
    pub filter: Option<DocumentFilter>,
    /// Maximum number of hits
    pub top: Option<usize>,
}

impl QueryRequest {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            filter: None,
            top: None,
        }
    }

    pub fn match_all() -> Self {
        Self::new("*")
    }

    pub fn with_filter(mut self, filter: DocumentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }
}

/// A document with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    #[serde(rename = "@search.score", default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub document: IndexDocument,
}

/// Hits of a query plus the total match count
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "@odata.count", default)]
    pub total_count: Option<u64>,
    #[serde(rename = "value", default)]
    pub results: Vec<ScoredDocument>,
}

/// Remote search index service
#[async_trait]
pub trait SearchIndexService: Send + Sync {
    /// Create the index or update its schema; idempotent
    async fn create_or_update_index(&self, definition: &IndexDefinition) -> Result<()>;

    async fn list_indexes(&self) -> Result<Vec<String>>;

    async fn document_count(&self, index: &str) -> Result<u64>;

    /// Upsert a batch of documents
    async fn upload_documents(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<Vec<IndexingStatus>>;

    /// Delete documents by key. With `throw_on_any_error` a failed key
    /// fails the whole call.
    async fn delete_documents(
        &self,
        index: &str,
        key_field: &str,
        keys: &[String],
        throw_on_any_error: bool,
    ) -> Result<Vec<IndexingStatus>>;

    /// Run a query. `None` means the service answered without a body.
    async fn query(&self, index: &str, request: &QueryRequest) -> Result<Option<QueryResponse>>;
}
