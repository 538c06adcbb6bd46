//! Show-config command - show current configuration

use crate::cli::output::{colors, emit, format_bytes};
use crate::cli::OutputFormat;
use crate::core::config::{Config, LoggingConfig, SearchConfig, StorageConfig};
use crate::core::services::Services;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the show-config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
pub struct RemoteView {
    pub endpoint: Option<String>,
    /// Never the key itself
    pub api_key_set: bool,
    pub api_version: String,
    pub preview_api_version: String,
    pub related_content: bool,
    pub request_timeout_sec: u64,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub remote: RemoteView,
    pub logging: LoggingConfig,
}

impl ConfigResponse {
    pub fn new(config: &Config, xdg: &XdgDirs) -> Self {
        Self {
            config_file: xdg.config_file().to_string_lossy().into_owned(),
            storage: config.storage.clone(),
            search: config.search.clone(),
            remote: RemoteView {
                endpoint: config.remote.endpoint.clone(),
                api_key_set: config
                    .remote
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty()),
                api_version: config.remote.api_version.clone(),
                preview_api_version: config.remote.preview_api_version.clone(),
                related_content: config.remote.related_content,
                request_timeout_sec: config.remote.request_timeout_sec,
            },
            logging: config.logging.clone(),
        }
    }
}

/// Execute the show-config command
pub async fn execute(
    _args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = ConfigResponse::new(&services.config, &XdgDirs::new());

    emit(&response, format, |r| {
        println!("{}", colors::label("Configuration:"));
        println!("  config_file: {}", r.config_file);
        println!("  storage:");
        println!("    container: {}", r.storage.container);
        println!("    chunk_size: {}", format_bytes(r.storage.chunk_size as u64));
        println!(
            "    output_buffer_size: {}",
            format_bytes(r.storage.output_buffer_size as u64)
        );
        println!("    lease_duration: {}s", r.storage.lease_duration_secs);
        println!("  search:");
        println!("    provider: {}", colors::index_name(&r.search.provider.to_string()));
        println!("    default_max: {}", r.search.default_max);
        println!("    max_results: {}", r.search.max_results);
        println!(
            "    writer_heap: {}",
            format_bytes(r.search.writer_heap_bytes as u64)
        );
        println!("    index_dir: {}", r.search.index_dir.display());
        println!("  remote:");
        println!(
            "    endpoint: {}",
            r.remote.endpoint.as_deref().unwrap_or("<none>")
        );
        println!(
            "    api_key: {}",
            if r.remote.api_key_set { "<redacted>" } else { "<none>" }
        );
        println!("    api_version: {}", r.remote.api_version);
        println!("    preview_api_version: {}", r.remote.preview_api_version);
        println!("    related_content: {}", r.remote.related_content);
        println!("    request_timeout: {}s", r.remote.request_timeout_sec);
        println!("  logging:");
        println!("    level: {}", r.logging.level);
        println!("    json: {}", r.logging.json);
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_never_contains_key() {
        let mut config = Config::default();
        config.remote.api_key = Some("super-secret".to_string());

        let response = ConfigResponse::new(&config, &XdgDirs::new());
        assert!(response.remote.api_key_set);

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("\"provider\":\"local\""));
    }
}
