//! XDG Base Directory Support
//!
//! Resolves where blobsearch reads its config file and keeps local indexes.

use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "blobsearch";

/// XDG directory structure for blobsearch
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl XdgDirs {
    /// Resolve directories.
    ///
    /// Priority order (highest to lowest):
    /// 1. Explicit BLOBSEARCH_* env vars
    /// 2. XDG_* environment variables
    /// 3. XDG defaults (~/.config, ~/.local/share)
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve("BLOBSEARCH_CONFIG_DIR", "XDG_CONFIG_HOME", &[".config"]),
            data_dir: Self::resolve("BLOBSEARCH_DATA_DIR", "XDG_DATA_HOME", &[".local", "share"]),
        }
    }

    fn resolve(explicit: &str, xdg_var: &str, default: &[&str]) -> PathBuf {
        if let Ok(dir) = env::var(explicit) {
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = env::var(xdg_var) {
            return PathBuf::from(xdg).join(APP_DIR);
        }

        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        for part in default {
            path.push(part);
        }
        path.join(APP_DIR)
    }

    /// Get config file path
    pub fn config_file(&self) -> PathBuf {
        if let Ok(file) = env::var("BLOBSEARCH_CONFIG_FILE") {
            return PathBuf::from(file);
        }

        self.config_dir.join("config.toml")
    }

    /// Root of the local index catalog
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Log the resolved XDG paths
    pub fn log_paths(&self) {
        tracing::debug!("XDG directories resolved:");
        tracing::debug!("  Config: {:?}", self.config_dir);
        tracing::debug!("  Data: {:?}", self.data_dir);
        tracing::debug!("  Config file: {:?}", self.config_file());
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
