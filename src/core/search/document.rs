//! Indexed document shape and tenant index schema.
//!
//! Field names are PascalCase on the wire; the same names are used for
//! the Tantivy schema of the local provider.

use crate::core::types::{SearchEngineEntry, SearchEngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every tenant index name
pub const INDEX_NAME_PREFIX: &str = "index-";

/// Key field of every tenant index
pub const KEY_FIELD: &str = "Id";

/// Fields compared by a related-content query
pub const RELATED_FIELDS: [&str; 3] = ["Body", "Tags", "Title"];

/// Analyzer used for full-text fields
pub const TEXT_ANALYZER: &str = "standard.lucene";

/// Index name for a tenant
pub fn index_name(tenant_id: i32) -> String {
    format!("{INDEX_NAME_PREFIX}{tenant_id}")
}

/// Tenant id encoded in an index name, if it follows the convention
pub fn tenant_from_index_name(name: &str) -> Option<i32> {
    name.strip_prefix(INDEX_NAME_PREFIX)?.parse().ok()
}

/// Denormalized projection of a [`SearchEngineEntry`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDocument {
    pub id: String,
    pub tenant_id: i32,
    pub tenant_name: String,
    pub body: String,
    pub group_id: i32,
    pub is_published: bool,
    pub name: String,
    pub publish_date: DateTime<Utc>,
    pub tags: String,
    pub title: String,
}

impl From<&SearchEngineEntry> for IndexDocument {
    fn from(entry: &SearchEngineEntry) -> Self {
        Self {
            id: entry.entry_id.to_string(),
            tenant_id: entry.tenant_id,
            tenant_name: entry.tenant_name.clone(),
            body: entry.body.clone(),
            group_id: entry.group_id,
            is_published: entry.is_published,
            name: entry.entry_name.clone().unwrap_or_default(),
            publish_date: entry.publish_date,
            tags: entry.tags.clone(),
            title: entry.title.clone(),
        }
    }
}

impl IndexDocument {
    /// Build a query result from this document.
    ///
    /// Returns `None` when the key is not a numeric entry id, which only
    /// happens for documents written by something other than this crate.
    pub fn to_result(&self, score: f32) -> Option<SearchEngineResult> {
        let entry_id = self.id.parse().ok()?;
        Some(SearchEngineResult {
            tenant_name: self.tenant_name.clone(),
            entry_id,
            entry_name: self.name.clone(),
            publish_date: self.publish_date,
            score,
            title: self.title.clone(),
        })
    }
}

/// Field data types supported by the index schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
}

/// One field of a tenant index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

impl FieldDefinition {
    fn simple(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            key: false,
            filterable: true,
            searchable: false,
            sortable: false,
            analyzer: None,
        }
    }

    fn text(name: &str) -> Self {
        Self {
            searchable: true,
            analyzer: Some(TEXT_ANALYZER.to_string()),
            ..Self::simple(name, FieldType::String)
        }
    }
}

/// Schema of a tenant index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl IndexDefinition {
    /// The fixed schema every tenant index uses
    pub fn for_index(name: &str) -> Self {
        let fields = vec![
            FieldDefinition::simple("TenantId", FieldType::Int32),
            FieldDefinition::simple("TenantName", FieldType::String),
            FieldDefinition::text("Body"),
            FieldDefinition::simple("GroupId", FieldType::Int32),
            FieldDefinition {
                key: true,
                ..FieldDefinition::simple(KEY_FIELD, FieldType::String)
            },
            FieldDefinition::simple("IsPublished", FieldType::Boolean),
            FieldDefinition::simple("Name", FieldType::String),
            FieldDefinition {
                sortable: true,
                ..FieldDefinition::simple("PublishDate", FieldType::DateTimeOffset)
            },
            FieldDefinition::text("Tags"),
            FieldDefinition::text("Title"),
        ];

        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn for_tenant(tenant_id: i32) -> Self {
        Self::for_index(&index_name(tenant_id))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key)
    }
}

/// Filter applied to a document query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Match the single document with this key
    Id(String),
    /// Match every document owned by a tenant
    TenantId(i32),
}

impl DocumentFilter {
    pub fn entry(entry_id: i32) -> Self {
        DocumentFilter::Id(entry_id.to_string())
    }

    /// OData filter expression understood by the remote service
    pub fn to_odata(&self) -> String {
        match self {
            DocumentFilter::Id(id) => format!("{KEY_FIELD} eq '{}'", id.replace('\'', "''")),
            DocumentFilter::TenantId(tenant_id) => format!("TenantId eq {tenant_id}"),
        }
    }

    pub fn matches(&self, document: &IndexDocument) -> bool {
        match self {
            DocumentFilter::Id(id) => &document.id == id,
            DocumentFilter::TenantId(tenant_id) => document.tenant_id == *tenant_id,
        }
    }
}
