//! HTTP transport used by the related-content client.

use crate::core::error::{BlobSearchError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

/// Header carrying the search service key
pub const API_KEY_HEADER: &str = "api-key";

/// POST transport
#[async_trait]
pub trait HttpService: Send + Sync {
    /// POST `body` to `url` and return the response body.
    /// Non-success statuses are errors.
    async fn post_content(&self, body: String, mime_type: &str, url: &str) -> Result<String>;
}

/// [`HttpService`] over a shared reqwest client that sends the api key
/// with every request
#[derive(Debug, Clone)]
pub struct ReqwestHttpService {
    client: reqwest::Client,
}

impl ReqwestHttpService {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "api_key cannot be empty or blank".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(api_key)
            .map_err(|e| BlobSearchError::Config(format!("Invalid api_key: {e}")))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| BlobSearchError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpService for ReqwestHttpService {
    async fn post_content(&self, body: String, mime_type: &str, url: &str) -> Result<String> {
        if body.trim().is_empty() {
            return Err(BlobSearchError::invalid_argument("body", "cannot be empty or blank"));
        }
        if url.trim().is_empty() {
            return Err(BlobSearchError::invalid_argument("url", "cannot be empty or blank"));
        }

        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, mime_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BlobSearchError::Remote {
                status: status.as_u16(),
                message: if text.is_empty() {
                    "(no response body)".to_string()
                } else {
                    text
                },
            });
        }

        Ok(text)
    }
}
