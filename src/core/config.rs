//! Configuration management for blobsearch.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::related::DEFAULT_PREVIEW_API_VERSION;
use crate::core::search::rest::DEFAULT_API_VERSION;
use crate::core::storage::{DirectorySettings, MIN_WRITER_HEAP_BYTES};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Blob-backed index directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Container holding the index files
    #[serde(default = "default_container")]
    pub container: String,

    /// Max bytes per ranged read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Write buffer size of index outputs
    #[serde(default = "default_output_buffer_size")]
    pub output_buffer_size: usize,

    /// Lease length for index locks
    #[serde(default = "default_lease_duration")]
    pub lease_duration_secs: u64,
}

/// Which search backend serves tenant indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// Tantivy indexes on local disk
    #[default]
    Local,
    /// Remote search service over REST
    Remote,
}

impl std::fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchProvider::Local => write!(f, "local"),
            SearchProvider::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for SearchProvider {
    type Err = BlobSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(SearchProvider::Local),
            "remote" => Ok(SearchProvider::Remote),
            other => Err(BlobSearchError::Config(format!(
                "Unknown search provider '{other}' (expected local or remote)"
            ))),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProvider,

    /// Default number of results to return
    #[serde(default = "default_max")]
    pub default_max: usize,

    /// Maximum results per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Tantivy writer heap per local index
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,

    /// Root directory for local indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

/// Remote search service configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Service root, e.g. `https://name.search.windows.net`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Version used for related-content queries
    #[serde(default = "default_preview_api_version")]
    pub preview_api_version: String,

    /// Enable related-content queries
    #[serde(default = "default_related_content")]
    pub related_content: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("preview_api_version", &self.preview_api_version)
            .field("related_content", &self.related_content)
            .field("request_timeout_sec", &self.request_timeout_sec)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_container() -> String {
    "search-index".to_string()
}

fn default_chunk_size() -> usize {
    4096
}

fn default_output_buffer_size() -> usize {
    16 * 1024
}

fn default_lease_duration() -> u64 {
    60
}

fn default_max() -> usize {
    10
}

fn default_max_results() -> usize {
    100
}

fn default_writer_heap_bytes() -> usize {
    50_000_000
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_preview_api_version() -> String {
    DEFAULT_PREVIEW_API_VERSION.to_string()
}

fn default_related_content() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            chunk_size: default_chunk_size(),
            output_buffer_size: default_output_buffer_size(),
            lease_duration_secs: default_lease_duration(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::default(),
            default_max: default_max(),
            max_results: default_max_results(),
            writer_heap_bytes: default_writer_heap_bytes(),
            index_dir: default_index_dir(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: default_api_version(),
            preview_api_version: default_preview_api_version(),
            related_content: default_related_content(),
            request_timeout_sec: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BlobSearchError::Config(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. BLOBSEARCH_CONFIG env var
    /// 2. XDG config file (~/.config/blobsearch/config.toml)
    /// 3. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("BLOBSEARCH_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else {
                Self::default()
            }
        };

        if env::var("BLOBSEARCH_INDEX_DIR").is_err()
            && config.search.index_dir == default_index_dir()
        {
            config.search.index_dir = xdg.index_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Storage configuration
        if let Ok(container) = env::var("BLOBSEARCH_CONTAINER") {
            self.storage.container = container;
        }
        if let Some(size) = parse_env("BLOBSEARCH_CHUNK_SIZE") {
            self.storage.chunk_size = size;
        }
        if let Some(size) = parse_env("BLOBSEARCH_OUTPUT_BUFFER_SIZE") {
            self.storage.output_buffer_size = size;
        }
        if let Some(secs) = parse_env("BLOBSEARCH_LEASE_DURATION_SECS") {
            self.storage.lease_duration_secs = secs;
        }

        // Search configuration
        if let Some(provider) = parse_env("BLOBSEARCH_PROVIDER") {
            self.search.provider = provider;
        }
        if let Some(max) = parse_env("BLOBSEARCH_DEFAULT_MAX") {
            self.search.default_max = max;
        }
        if let Some(max) = parse_env("BLOBSEARCH_MAX_RESULTS") {
            self.search.max_results = max;
        }
        if let Some(bytes) = parse_env("BLOBSEARCH_WRITER_HEAP_BYTES") {
            self.search.writer_heap_bytes = bytes;
        }
        if let Ok(dir) = env::var("BLOBSEARCH_INDEX_DIR") {
            self.search.index_dir = PathBuf::from(dir);
        }

        // Remote configuration
        if let Ok(endpoint) = env::var("BLOBSEARCH_ENDPOINT") {
            self.remote.endpoint = Some(endpoint);
        }
        if let Ok(api_key) = env::var("BLOBSEARCH_API_KEY") {
            self.remote.api_key = Some(api_key);
        }
        if let Ok(version) = env::var("BLOBSEARCH_API_VERSION") {
            self.remote.api_version = version;
        }
        if let Ok(version) = env::var("BLOBSEARCH_PREVIEW_API_VERSION") {
            self.remote.preview_api_version = version;
        }
        if let Some(enabled) = parse_env("BLOBSEARCH_RELATED_CONTENT") {
            self.remote.related_content = enabled;
        }
        if let Some(timeout) = parse_env("BLOBSEARCH_REQUEST_TIMEOUT_SEC") {
            self.remote.request_timeout_sec = timeout;
        }

        // Logging configuration
        if let Ok(level) = env::var("BLOBSEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("BLOBSEARCH_LOG_JSON") {
            self.logging.json = json;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Storage config
        if self.storage.container.trim().is_empty() {
            return Err(BlobSearchError::Config(
                "Container name cannot be empty".to_string(),
            ));
        }

        if self.storage.chunk_size == 0 {
            return Err(BlobSearchError::Config(
                "Chunk size must be non-zero".to_string(),
            ));
        }

        if self.storage.output_buffer_size == 0 {
            return Err(BlobSearchError::Config(
                "Output buffer size must be non-zero".to_string(),
            ));
        }

        if self.storage.lease_duration_secs == 0 {
            return Err(BlobSearchError::Config(
                "Lease duration must be non-zero".to_string(),
            ));
        }

        // Search config
        if self.search.default_max == 0 {
            return Err(BlobSearchError::Config(
                "Default max must be non-zero".to_string(),
            ));
        }

        if self.search.default_max > self.search.max_results {
            return Err(BlobSearchError::Config(
                "Default max cannot exceed max results".to_string(),
            ));
        }

        if self.search.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(BlobSearchError::Config(format!(
                "Writer heap must be at least {MIN_WRITER_HEAP_BYTES} bytes"
            )));
        }

        // Remote config
        if self.remote.request_timeout_sec == 0 {
            return Err(BlobSearchError::Config(
                "Request timeout must be non-zero".to_string(),
            ));
        }

        if self.search.provider == SearchProvider::Remote {
            if non_blank(&self.remote.endpoint).is_none() {
                return Err(BlobSearchError::Config(
                    "Remote provider requires an endpoint".to_string(),
                ));
            }
            if non_blank(&self.remote.api_key).is_none() {
                return Err(BlobSearchError::Config(
                    "Remote provider requires an api key".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Settings for an [`ObjectStoreDirectory`](crate::core::storage::ObjectStoreDirectory)
    pub fn directory_settings(&self) -> DirectorySettings {
        DirectorySettings {
            lease_duration: Duration::from_secs(self.storage.lease_duration_secs),
            chunk_size: self.storage.chunk_size,
            buffer_size: self.storage.output_buffer_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_sec)
    }

    /// Log configuration (redacting sensitive values)
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Provider: {}", self.search.provider);
        tracing::info!("  Container: {}", self.storage.container);
        tracing::info!("  Chunk size: {} bytes", self.storage.chunk_size);
        tracing::info!("  Output buffer: {} bytes", self.storage.output_buffer_size);
        tracing::info!("  Lease duration: {}s", self.storage.lease_duration_secs);
        tracing::info!("  Default max: {}", self.search.default_max);
        tracing::info!("  Max results: {}", self.search.max_results);
        tracing::info!("  Writer heap: {} bytes", self.search.writer_heap_bytes);
        tracing::info!("  Index dir: {:?}", self.search.index_dir);
        tracing::info!(
            "  Endpoint: {}",
            self.remote.endpoint.as_deref().unwrap_or("<none>")
        );
        tracing::info!(
            "  API key: {}",
            if self.remote.api_key.is_some() {
                "<redacted>"
            } else {
                "<none>"
            }
        );
        tracing::info!("  API version: {}", self.remote.api_version);
        tracing::info!("  Related content: {}", self.remote.related_content);
        tracing::info!("  Request timeout: {}s", self.remote.request_timeout_sec);
    }
}
