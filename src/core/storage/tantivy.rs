//! Tantivy index holding one tenant's documents.
//!
//! The Tantivy schema is derived from the tenant [`IndexDefinition`], so
//! the local provider and the remote service share field names and
//! field roles.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::document::{
    DocumentFilter, FieldType, IndexDefinition, IndexDocument, KEY_FIELD,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT,
};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

/// Current on-disk schema version
/// Version 1: Tenant document schema, PublishDate as i64 milliseconds
pub const SCHEMA_VERSION: u32 = 1;

/// Smallest writer heap Tantivy accepts for one indexing thread
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Build the Tantivy schema for a tenant index definition
///
/// - searchable strings: TEXT | STORED
/// - other strings (including the key): STRING | STORED
/// - Int32: i64, INDEXED | STORED
/// - Boolean: INDEXED | STORED
/// - DateTimeOffset: i64 milliseconds, INDEXED | STORED | FAST
pub fn create_schema(definition: &IndexDefinition) -> Schema {
    let mut builder = Schema::builder();

    for field in &definition.fields {
        match field.field_type {
            FieldType::String if field.searchable => {
                builder.add_text_field(&field.name, TEXT | STORED);
            }
            FieldType::String => {
                builder.add_text_field(&field.name, STRING | STORED);
            }
            FieldType::Int32 => {
                builder.add_i64_field(&field.name, INDEXED | STORED);
            }
            FieldType::Boolean => {
                builder.add_bool_field(&field.name, INDEXED | STORED);
            }
            FieldType::DateTimeOffset => {
                builder.add_i64_field(&field.name, INDEXED | STORED | FAST);
            }
        }
    }

    builder.build()
}

/// Resolved schema fields
#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    tenant_id: Field,
    tenant_name: Field,
    body: Field,
    group_id: Field,
    is_published: Field,
    name: Field,
    publish_date: Field,
    tags: Field,
    title: Field,
}

impl Fields {
    /// Full-text searchable fields
    fn text_fields(self) -> Vec<Field> {
        vec![self.body, self.tags, self.title]
    }

    fn resolve(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| BlobSearchError::Storage(format!("Missing {name} field: {e}")))
        };

        Ok(Self {
            id: field(KEY_FIELD)?,
            tenant_id: field("TenantId")?,
            tenant_name: field("TenantName")?,
            body: field("Body")?,
            group_id: field("GroupId")?,
            is_published: field("IsPublished")?,
            name: field("Name")?,
            publish_date: field("PublishDate")?,
            tags: field("Tags")?,
            title: field("Title")?,
        })
    }

    fn to_tantivy(self, document: &IndexDocument) -> TantivyDocument {
        doc!(
            self.id => document.id.as_str(),
            self.tenant_id => i64::from(document.tenant_id),
            self.tenant_name => document.tenant_name.as_str(),
            self.body => document.body.as_str(),
            self.group_id => i64::from(document.group_id),
            self.is_published => document.is_published,
            self.name => document.name.as_str(),
            self.publish_date => document.publish_date.timestamp_millis(),
            self.tags => document.tags.as_str(),
            self.title => document.title.as_str(),
        )
    }

    fn from_tantivy(self, doc: &TantivyDocument) -> IndexDocument {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let int = |field: Field| doc.get_first(field).and_then(|v| v.as_i64()).unwrap_or(0);

        IndexDocument {
            id: text(self.id),
            tenant_id: i32::try_from(int(self.tenant_id)).unwrap_or_default(),
            tenant_name: text(self.tenant_name),
            body: text(self.body),
            group_id: i32::try_from(int(self.group_id)).unwrap_or_default(),
            is_published: doc
                .get_first(self.is_published)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            name: text(self.name),
            publish_date: DateTime::<Utc>::from_timestamp_millis(int(self.publish_date))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            tags: text(self.tags),
            title: text(self.title),
        }
    }

    fn key_term(self, id: &str) -> Term {
        Term::from_field_text(self.id, id)
    }
}

/// Tantivy index wrapper for one tenant
pub struct TenantIndex {
    /// Tantivy index instance
    index: Index,

    fields: Fields,

    /// Single writer; Tantivy allows one per index
    writer: Mutex<IndexWriter>,

    /// Reader reloaded after every commit
    reader: IndexReader,
}

impl std::fmt::Debug for TenantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantIndex")
            .field("schema", &"<schema>")
            .finish()
    }
}

impl TenantIndex {
    /// Create an index held in memory
    pub fn create_in_ram(definition: &IndexDefinition, writer_heap_bytes: usize) -> Result<Self> {
        let index = Index::create_in_ram(create_schema(definition));
        Self::from_index(index, writer_heap_bytes)
    }

    /// Open the index in `index_dir`, creating it (and the directory) if
    /// needed
    pub fn open_or_create(
        index_dir: &Path,
        definition: &IndexDefinition,
        writer_heap_bytes: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let directory = MmapDirectory::open(index_dir)
            .map_err(|e| BlobSearchError::Storage(format!("Failed to open index directory: {e}")))?;
        let index = Index::open_or_create(directory, create_schema(definition))
            .map_err(|e| BlobSearchError::Storage(format!("Failed to open index: {e}")))?;

        Self::from_index(index, writer_heap_bytes)
    }

    fn from_index(index: Index, writer_heap_bytes: usize) -> Result<Self> {
        let fields = Fields::resolve(&index.schema())?;

        let writer = index
            .writer_with_num_threads(1, writer_heap_bytes.max(MIN_WRITER_HEAP_BYTES))
            .map_err(|e| BlobSearchError::Storage(format!("Failed to create writer: {e}")))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
        })
    }

    fn writer(&self) -> MutexGuard<'_, IndexWriter> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
        writer
            .commit()
            .map_err(|e| BlobSearchError::Indexing(format!("Failed to commit: {e}")))?;
        self.reader
            .reload()
            .map_err(|e| BlobSearchError::Storage(format!("Failed to reload reader: {e}")))?;
        Ok(())
    }

    /// Replace any document with the same key, then commit
    pub fn upsert(&self, document: &IndexDocument) -> Result<()> {
        let mut writer = self.writer();
        writer.delete_term(self.fields.key_term(&document.id));
        writer
            .add_document(self.fields.to_tantivy(document))
            .map_err(|e| BlobSearchError::Indexing(format!("Failed to add document: {e}")))?;
        self.commit(&mut writer)
    }

    /// Delete documents by key, then commit. Missing keys are ignored.
    pub fn delete(&self, ids: &[String]) -> Result<()> {
        let mut writer = self.writer();
        for id in ids {
            writer.delete_term(self.fields.key_term(id));
        }
        self.commit(&mut writer)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        let query = TermQuery::new(self.fields.key_term(id), IndexRecordOption::Basic);
        let count = self
            .reader
            .searcher()
            .search(&query, &Count)
            .map_err(|e| BlobSearchError::Storage(format!("Search failed: {e}")))?;
        Ok(count > 0)
    }

    /// Number of live documents
    pub fn count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Parse free text leniently. Text with syntax errors (a stray quote,
    /// a dangling `AND`, a `word:` prefix naming no field) is matched on
    /// its words instead, like the remote simple query syntax.
    fn text_query(&self, text: &str) -> Result<Box<dyn Query>> {
        if text.trim() == "*" {
            return Ok(Box::new(AllQuery));
        }

        let fields = self.fields.text_fields();
        let parser = QueryParser::for_index(&self.index, fields.clone());
        let (query, errors) = parser.parse_query_lenient(text);
        if errors.is_empty() {
            return Ok(query);
        }

        tracing::debug!(
            "Query '{}' has {} syntax errors, matching its words: {:?}",
            text,
            errors.len(),
            errors
        );
        self.any_word_query(text, &fields)
    }

    /// Match documents containing any token of `text` in any of `fields`
    fn any_word_query(&self, text: &str, fields: &[Field]) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for &field in fields {
            let mut analyzer = self.index.tokenizer_for_field(field).map_err(|e| {
                BlobSearchError::Storage(format!("Missing tokenizer for field: {e}"))
            })?;
            let mut stream = analyzer.token_stream(text);
            stream.process(&mut |token| {
                clauses.push((
                    Occur::Should,
                    Box::new(TermQuery::new(
                        Term::from_field_text(field, &token.text),
                        IndexRecordOption::WithFreqs,
                    )),
                ));
            });
        }

        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// BM25-ranked search over Body, Tags and Title. `*` matches every
    /// document.
    pub fn search(
        &self,
        query: &str,
        filter: Option<&DocumentFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<(f32, IndexDocument)>> {
        let searcher = self.reader.searcher();
        let limit = limit.unwrap_or_else(|| usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX));
        // TopDocs rejects a zero limit
        if limit == 0 {
            return Ok(Vec::new());
        }

        let text_query = self.text_query(query)?;

        let query: Box<dyn Query> = match filter {
            Some(filter) => {
                let term = match filter {
                    DocumentFilter::Id(id) => self.fields.key_term(id),
                    DocumentFilter::TenantId(tenant_id) => {
                        Term::from_field_i64(self.fields.tenant_id, i64::from(*tenant_id))
                    }
                };
                let filter_query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, text_query),
                    (Occur::Must, filter_query),
                ]))
            }
            None => text_query,
        };

        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|e| BlobSearchError::Storage(format!("Search failed: {e}")))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address).map_err(|e| {
                BlobSearchError::Storage(format!("Failed to retrieve document: {e}"))
            })?;
            results.push((score, self.fields.from_tantivy(&doc)));
        }
        Ok(results)
    }
}
