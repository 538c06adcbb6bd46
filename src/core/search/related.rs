//! "More like this" queries against the preview search endpoint.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::document::{DocumentFilter, RELATED_FIELDS};
use crate::core::search::http::HttpService;
use crate::core::types::SearchEngineResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Preview API version exposing `moreLikeThis`
pub const DEFAULT_PREVIEW_API_VERSION: &str = "2020-06-30-Preview";

#[derive(Debug, Serialize)]
struct RelatedRequest {
    #[serde(rename = "searchFields")]
    fields: String,
    filter: String,
    #[serde(rename = "moreLikeThis")]
    more_like_this: String,
}

#[derive(Debug, Deserialize)]
struct RelatedResponse {
    #[serde(default)]
    value: Option<Vec<RelatedHit>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedHit {
    id: String,
    #[serde(default)]
    tenant_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    title: String,
    #[serde(rename = "@search.score", default)]
    score: Option<f64>,
}

/// Client for the related-content endpoint of one index
pub struct RelatedContentClient {
    http: Arc<dyn HttpService>,
    base_url: String,
}

impl std::fmt::Debug for RelatedContentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelatedContentClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RelatedContentClient {
    /// Blank endpoint or index name is a configuration error. A blank
    /// version falls back to [`DEFAULT_PREVIEW_API_VERSION`].
    pub fn new(
        endpoint: &str,
        index_name: &str,
        http: Arc<dyn HttpService>,
        version: Option<&str>,
    ) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "endpoint cannot be empty or blank".to_string(),
            ));
        }
        if index_name.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "index name cannot be empty or blank".to_string(),
            ));
        }

        let version = version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_PREVIEW_API_VERSION);

        Ok(Self {
            http,
            base_url: format!(
                "{}/indexes/{}/docs/search?api-version={}",
                endpoint.trim_end_matches('/'),
                index_name,
                version
            ),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Entries similar to `entry_id` within the tenant.
    ///
    /// Never fails: transport errors, blank bodies and unparseable JSON
    /// all give an empty result. A hit without a score gets 1.0; a hit
    /// without a publish date is skipped.
    pub async fn search_related_contents(
        &self,
        tenant_id: i32,
        size: usize,
        entry_id: i32,
    ) -> Vec<SearchEngineResult> {
        let request = RelatedRequest {
            fields: RELATED_FIELDS.join(","),
            filter: DocumentFilter::TenantId(tenant_id).to_odata(),
            more_like_this: entry_id.to_string(),
        };
        let body = match serde_json::to_string(&request) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to serialize moreLikeThis request: {}", e);
                return Vec::new();
            }
        };

        let url = format!("{}&$top={}", self.base_url, size);
        let content = match self.http.post_content(body, "application/json", &url).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("moreLikeThis request for entry {} failed: {}", entry_id, e);
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            tracing::error!("Received empty response from moreLikeThis request");
            return Vec::new();
        }

        let response: RelatedResponse = match serde_json::from_str(&content) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Received invalid response from moreLikeThis request: {}", e);
                return Vec::new();
            }
        };

        response
            .value
            .unwrap_or_default()
            .into_iter()
            .filter_map(|hit| {
                let Ok(entry_id) = hit.id.parse() else {
                    tracing::warn!("Skipping related hit with non-numeric id '{}'", hit.id);
                    return None;
                };
                let Some(publish_date) = hit.publish_date else {
                    tracing::warn!("Skipping related hit {} without a publish date", hit.id);
                    return None;
                };
                Some(SearchEngineResult {
                    tenant_name: hit.tenant_name,
                    entry_id,
                    entry_name: hit.name,
                    publish_date,
                    score: hit.score.map(|s| s as f32).unwrap_or(1.0),
                    title: hit.title,
                })
            })
            .collect()
    }
}
