//! Index-entries command - index entries read from a JSON file

use crate::cli::output::{colors, emit, print_warning};
use crate::cli::OutputFormat;
use crate::core::services::{SearchEngineService, Services};
use crate::core::types::SearchEngineEntry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the index-entries command
#[derive(clap::Args, Debug)]
pub struct IndexArgs {
    /// JSON file holding one entry or an array of entries
    pub file: PathBuf,

    /// Ask the backend to optimize the index after the batch
    #[arg(long)]
    pub optimize: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexFailure {
    pub entry_id: i32,
    pub tenant_id: i32,
    pub message: String,
}

/// Indexing result response
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub file: String,
    pub submitted: usize,
    pub indexed: usize,
    pub errors: Vec<IndexFailure>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum EntryFile {
    Many(Vec<SearchEngineEntry>),
    One(Box<SearchEngineEntry>),
}

/// Read entries from `path`; accepts a single object or an array
pub fn read_entries(path: &Path) -> Result<Vec<SearchEngineEntry>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;

    let entries = match serde_json::from_str::<EntryFile>(&contents)
        .map_err(|e| format!("'{}' is not a valid entry file: {}", path.display(), e))?
    {
        EntryFile::Many(entries) => entries,
        EntryFile::One(entry) => vec![*entry],
    };
    Ok(entries)
}

/// Execute the index-entries command
pub async fn execute(
    args: IndexArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = read_entries(&args.file)?;
    if entries.is_empty() {
        print_warning(&format!("'{}' contains no entries", args.file.display()));
    }

    let errors = services.engine.add_posts(&entries, args.optimize).await;

    let failed: std::collections::HashSet<i32> = errors.iter().map(|e| e.entry_id()).collect();
    let response = IndexResponse {
        file: args.file.display().to_string(),
        submitted: entries.len(),
        indexed: entries
            .iter()
            .filter(|e| !failed.contains(&e.entry_id))
            .count(),
        errors: errors
            .iter()
            .map(|e| IndexFailure {
                entry_id: e.entry_id(),
                tenant_id: e.entry.tenant_id,
                message: e.message.clone(),
            })
            .collect(),
    };

    emit(&response, format, |r| {
        println!(
            "Indexed {} of {} entries from {}",
            colors::number(&r.indexed.to_string()),
            colors::number(&r.submitted.to_string()),
            colors::label(&r.file)
        );
        for failure in &r.errors {
            println!(
                "  {} entry {} (tenant {}): {}",
                colors::error("failed"),
                failure.entry_id,
                failure.tenant_id,
                failure.message
            );
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ENTRY: &str = r#"{
        "tenant_id": 1, "tenant_name": "Blog", "body": "text", "group_id": 1,
        "entry_id": 2, "is_published": true, "publish_date": "2024-01-01T00:00:00Z",
        "title": "Hello"
    }"#;

    #[test]
    fn test_read_single_and_array() {
        let temp_dir = TempDir::new().unwrap();
        let one = temp_dir.path().join("one.json");
        let many = temp_dir.path().join("many.json");
        std::fs::write(&one, ENTRY).unwrap();
        std::fs::write(&many, format!("[{ENTRY}, {ENTRY}]")).unwrap();

        let entries = read_entries(&one).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_name, None);
        assert_eq!(entries[0].tags, "");
        assert_eq!(read_entries(&many).unwrap().len(), 2);
    }

    #[test]
    fn test_read_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{\"title\": 1}").unwrap();
        assert!(read_entries(&path).is_err());
        assert!(read_entries(&temp_dir.path().join("missing.json")).is_err());
    }
}
