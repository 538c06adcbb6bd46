//! REST binding of [`SearchIndexService`] for a cloud search account.
//!
//! Speaks the JSON wire format of Azure Cognitive Search: the key goes in
//! the `api-key` header, documents carry an `@search.action`, and query
//! responses report `@odata.count` plus per-hit `@search.score`.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::backend::{
    check_statuses, IndexingStatus, QueryRequest, QueryResponse, SearchIndexService,
};
use crate::core::search::document::{IndexDefinition, IndexDocument};
use crate::core::search::http::API_KEY_HEADER;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Stable API version used for every call except related content
pub const DEFAULT_API_VERSION: &str = "2020-06-30";

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    value: Vec<IndexListItem>,
}

#[derive(Debug, Deserialize)]
struct IndexListItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatusList {
    #[serde(default)]
    value: Vec<IndexingStatus>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    search: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<usize>,
    count: bool,
}

/// Search service reached over HTTPS
#[derive(Debug, Clone)]
pub struct RestSearchService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl RestSearchService {
    /// Build a client. Blank endpoint or key is a configuration error.
    pub fn new(endpoint: &str, api_key: &str, api_version: &str, timeout: Duration) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "endpoint cannot be empty or blank".to_string(),
            ));
        }
        if api_key.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "api_key cannot be empty or blank".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobSearchError::Config(format!("Failed to build HTTP client: {e}")))?;

        let api_version = if api_version.trim().is_empty() {
            DEFAULT_API_VERSION
        } else {
            api_version
        };

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_version: api_version.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.endpoint, path, self.api_version)
    }

    async fn send(&self, request: RequestBuilder, index: Option<&str>) -> Result<Response> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(index) = index {
                return Err(BlobSearchError::IndexNotFound(index.to_string()));
            }
        }

        let message = response.text().await.unwrap_or_default();
        Err(BlobSearchError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn index_batch(&self, index: &str, actions: Vec<Value>) -> Result<Vec<IndexingStatus>> {
        let url = self.url(&format!("indexes/{index}/docs/index"));
        tracing::debug!("Submitting {} document actions to {}", actions.len(), index);

        let response = self
            .send(self.client.post(url).json(&json!({ "value": actions })), Some(index))
            .await?;
        let statuses: StatusList = response.json().await?;
        Ok(statuses.value)
    }
}

fn action(name: &str, mut fields: Map<String, Value>) -> Value {
    fields.insert("@search.action".to_string(), Value::String(name.to_string()));
    Value::Object(fields)
}

#[async_trait]
impl SearchIndexService for RestSearchService {
    async fn create_or_update_index(&self, definition: &IndexDefinition) -> Result<()> {
        let url = self.url(&format!("indexes/{}", definition.name));
        tracing::debug!("Ensuring index {} exists", definition.name);
        self.send(self.client.put(url).json(definition), None).await?;
        Ok(())
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        let url = format!("{}&$select=name", self.url("indexes"));
        let response = self.send(self.client.get(url), None).await?;
        let list: IndexList = response.json().await?;
        Ok(list.value.into_iter().map(|i| i.name).collect())
    }

    async fn document_count(&self, index: &str) -> Result<u64> {
        let url = self.url(&format!("indexes/{index}/docs/$count"));
        let response = self.send(self.client.get(url), Some(index)).await?;
        let text = response.text().await?;

        // The count endpoint answers with a bare number, sometimes BOM-prefixed
        text.trim_start_matches('\u{feff}')
            .trim()
            .parse()
            .map_err(|_| BlobSearchError::Remote {
                status: 200,
                message: format!("invalid document count '{text}'"),
            })
    }

    async fn upload_documents(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<Vec<IndexingStatus>> {
        let mut actions = Vec::with_capacity(documents.len());
        for document in documents {
            match serde_json::to_value(document)? {
                Value::Object(fields) => actions.push(action("upload", fields)),
                other => {
                    return Err(BlobSearchError::Indexing(format!(
                        "document serialized to {other}, expected an object"
                    )))
                }
            }
        }
        self.index_batch(index, actions).await
    }

    async fn delete_documents(
        &self,
        index: &str,
        key_field: &str,
        keys: &[String],
        throw_on_any_error: bool,
    ) -> Result<Vec<IndexingStatus>> {
        let actions = keys
            .iter()
            .map(|key| {
                let mut fields = Map::new();
                fields.insert(key_field.to_string(), Value::String(key.clone()));
                action("delete", fields)
            })
            .collect();

        let statuses = self.index_batch(index, actions).await?;
        check_statuses(statuses, throw_on_any_error)
    }

    async fn query(&self, index: &str, request: &QueryRequest) -> Result<Option<QueryResponse>> {
        let url = self.url(&format!("indexes/{index}/docs/search"));
        let body = SearchBody {
            search: &request.search,
            filter: request.filter.as_ref().map(|f| f.to_odata()),
            top: request.top,
            count: true,
        };

        let response = self
            .send(self.client.post(url).json(&body), Some(index))
            .await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_configuration_rejected() {
        let timeout = Duration::from_secs(5);
        assert!(matches!(
            RestSearchService::new("", "key", "", timeout),
            Err(BlobSearchError::Config(_))
        ));
        assert!(matches!(
            RestSearchService::new("https://example.search.windows.net", " ", "", timeout),
            Err(BlobSearchError::Config(_))
        ));
    }

    #[test]
    fn test_urls() {
        let service = RestSearchService::new(
            "https://example.search.windows.net/",
            "key",
            "",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(service.endpoint(), "https://example.search.windows.net");
        assert_eq!(
            service.url("indexes/index-1/docs/search"),
            "https://example.search.windows.net/indexes/index-1/docs/search?api-version=2020-06-30"
        );
    }

    #[test]
    fn test_action_payload() {
        let mut fields = Map::new();
        fields.insert("Id".to_string(), Value::String("9".to_string()));
        let value = action("delete", fields);
        assert_eq!(value["@search.action"], "delete");
        assert_eq!(value["Id"], "9");
    }

    #[test]
    fn test_search_body_skips_empty_options() {
        let body = SearchBody {
            search: "*",
            filter: None,
            top: None,
            count: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, json!({ "search": "*", "count": true }));
    }
}
