//! On-disk catalog of local tenant indexes.
//!
//! Layout under the configured index directory:
//!
//! ```text
//! {index_dir}/indexes/
//! ├── index-1/
//! │   ├── meta.json           # Index metadata
//! │   └── tantivy/            # Tantivy index
//! └── index-2/
//! ```

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::document::{tenant_from_index_name, IndexDefinition};
use crate::core::storage::tantivy::{TenantIndex, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Metadata stored next to each local index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub tenant_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u32,
}

/// Catalog of tenant indexes under one directory
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    root: PathBuf,
    writer_heap_bytes: usize,
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BlobSearchError::invalid_argument(
            "index",
            format!("'{name}' is not a valid index name"),
        ))
    }
}

impl IndexCatalog {
    pub fn new(root: PathBuf, writer_heap_bytes: usize) -> Self {
        Self {
            root,
            writer_heap_bytes,
        }
    }

    fn indexes_dir(&self) -> PathBuf {
        self.root.join("indexes")
    }

    fn index_dir(&self, name: &str) -> PathBuf {
        self.indexes_dir().join(name)
    }

    fn tantivy_dir(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("tantivy")
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("meta.json")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.metadata_path(name).exists()
    }

    /// Open the index, creating it and its metadata if missing
    pub fn ensure(&self, name: &str) -> Result<TenantIndex> {
        validate_name(name)?;

        if self.exists(name) {
            return self.open(name);
        }

        fs::create_dir_all(self.index_dir(name))?;
        let index = TenantIndex::open_or_create(
            &self.tantivy_dir(name),
            &IndexDefinition::for_index(name),
            self.writer_heap_bytes,
        )?;

        let now = Utc::now();
        let metadata = IndexMetadata {
            name: name.to_string(),
            tenant_id: tenant_from_index_name(name),
            created_at: now,
            updated_at: now,
            schema_version: SCHEMA_VERSION,
        };
        self.write_metadata(&metadata)?;
        tracing::info!("Created local index {}", name);

        Ok(index)
    }

    /// Open an existing index
    pub fn open(&self, name: &str) -> Result<TenantIndex> {
        validate_name(name)?;
        let metadata = self.metadata(name)?;

        if metadata.schema_version < SCHEMA_VERSION {
            return Err(BlobSearchError::Storage(format!(
                "Index '{}' uses old schema version {} (current: v{}). \
                 Delete it and re-index its entries.",
                name, metadata.schema_version, SCHEMA_VERSION
            )));
        }

        TenantIndex::open_or_create(
            &self.tantivy_dir(name),
            &IndexDefinition::for_index(name),
            self.writer_heap_bytes,
        )
    }

    pub fn metadata(&self, name: &str) -> Result<IndexMetadata> {
        let path = self.metadata_path(name);
        if !path.exists() {
            return Err(BlobSearchError::IndexNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_metadata(&self, metadata: &IndexMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(self.metadata_path(&metadata.name), json)?;
        Ok(())
    }

    /// Record a write to the index
    pub fn touch(&self, name: &str) -> Result<()> {
        let mut metadata = self.metadata(name)?;
        metadata.updated_at = Utc::now();
        self.write_metadata(&metadata)
    }

    /// Metadata of every index, sorted by name. Directories without
    /// readable metadata are skipped.
    pub fn list(&self) -> Result<Vec<IndexMetadata>> {
        let dir = self.indexes_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut indexes = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                match self.metadata(name) {
                    Ok(metadata) => indexes.push(metadata),
                    Err(e) => tracing::warn!("Skipping index directory {}: {}", name, e),
                }
            }
        }

        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEAP: usize = 20_000_000;

    fn catalog() -> (IndexCatalog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (IndexCatalog::new(temp_dir.path().to_path_buf(), HEAP), temp_dir)
    }

    #[test]
    fn test_ensure_creates_metadata() {
        let (catalog, _temp) = catalog();
        assert!(!catalog.exists("index-4"));

        let index = catalog.ensure("index-4").unwrap();
        drop(index);

        let metadata = catalog.metadata("index-4").unwrap();
        assert_eq!(metadata.tenant_id, Some(4));
        assert_eq!(metadata.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_ensure_twice_keeps_metadata() {
        let (catalog, _temp) = catalog();
        drop(catalog.ensure("index-4").unwrap());
        let first = catalog.metadata("index-4").unwrap();
        drop(catalog.ensure("index-4").unwrap());
        assert_eq!(catalog.metadata("index-4").unwrap().created_at, first.created_at);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (catalog, _temp) = catalog();
        assert!(catalog.ensure("../escape").unwrap_err().is_precondition());
        assert!(catalog.ensure("").is_err());
    }

    #[test]
    fn test_open_missing_index() {
        let (catalog, _temp) = catalog();
        assert!(catalog.open("index-1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let (catalog, _temp) = catalog();
        assert!(catalog.list().unwrap().is_empty());

        drop(catalog.ensure("index-2").unwrap());
        drop(catalog.ensure("index-1").unwrap());
        let names: Vec<String> = catalog.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["index-1", "index-2"]);
    }

    #[test]
    fn test_old_schema_version_rejected() {
        let (catalog, _temp) = catalog();
        drop(catalog.ensure("index-1").unwrap());

        let mut metadata = catalog.metadata("index-1").unwrap();
        metadata.schema_version = 0;
        catalog.write_metadata(&metadata).unwrap();

        let err = catalog.open("index-1").unwrap_err();
        assert!(err.to_string().contains("old schema version"));
    }
}
