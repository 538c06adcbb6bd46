//! Core data types for the blobsearch service.
//!
//! Source entries handed in by the host application, the results
//! handed back from queries, and per-entry indexing failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content entry submitted for indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEngineEntry {
    /// Tenant (site) that owns the entry
    pub tenant_id: i32,

    /// Denormalized tenant display name
    pub tenant_name: String,

    /// Full text body
    pub body: String,

    pub group_id: i32,

    /// Entry identifier, unique within a tenant
    pub entry_id: i32,

    pub is_published: bool,

    /// Optional URL slug
    #[serde(default)]
    pub entry_name: Option<String>,

    pub publish_date: DateTime<Utc>,

    /// Comma separated tag list
    #[serde(default)]
    pub tags: String,

    pub title: String,
}

/// One hit returned by a search or related-content query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEngineResult {
    pub tenant_name: String,
    pub entry_id: i32,
    pub entry_name: String,
    pub publish_date: DateTime<Utc>,

    /// Relevance score (higher = more relevant)
    pub score: f32,

    pub title: String,
}

/// Failure to index one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingError {
    pub entry: SearchEngineEntry,
    pub message: String,
}

impl IndexingError {
    pub fn new(entry: &SearchEngineEntry, message: impl Into<String>) -> Self {
        Self {
            entry: entry.clone(),
            message: message.into(),
        }
    }

    pub fn entry_id(&self) -> i32 {
        self.entry.entry_id
    }
}

impl std::fmt::Display for IndexingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry {}: {}", self.entry.entry_id, self.message)
    }
}
