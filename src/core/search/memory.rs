//! In-process [`SearchIndexService`] with fault injection.
//!
//! Keeps every index in memory and records how many calls of each kind
//! it served. Used by tests and for running the remote provider code
//! path without an account.

use crate::core::error::{BlobSearchError, Result};
use crate::core::search::backend::{
    check_statuses, IndexingStatus, QueryRequest, QueryResponse, ScoredDocument,
    SearchIndexService,
};
use crate::core::search::document::{IndexDefinition, IndexDocument};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct StoredIndex {
    definition: IndexDefinition,
    documents: BTreeMap<String, IndexDocument>,
}

#[derive(Debug, Default)]
struct State {
    indexes: BTreeMap<String, StoredIndex>,
    /// Document key -> error returned by the upload call
    upload_errors: HashMap<String, String>,
    /// Document key -> message of a rejected per-document status
    rejected: HashMap<String, String>,
    unavailable: Option<String>,
    empty_responses: bool,
    calls: HashMap<&'static str, usize>,
}

/// Search service held entirely in memory
#[derive(Debug, Default)]
pub struct MemorySearchService {
    state: Mutex<State>,
}

impl MemorySearchService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Count the call and fail it if the service is marked unavailable
    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(message) = &state.unavailable {
            return Err(BlobSearchError::Transport(message.clone()));
        }
        Ok(state)
    }

    /// Make the upload call itself fail for the document with `key`
    pub fn fail_upload(&self, key: &str, message: &str) {
        self.state()
            .upload_errors
            .insert(key.to_string(), message.to_string());
    }

    /// Report a failed status for the document with `key`
    pub fn reject_document(&self, key: &str, message: &str) {
        self.state()
            .rejected
            .insert(key.to_string(), message.to_string());
    }

    /// Fail every call with a transport error until cleared with `None`
    pub fn set_unavailable(&self, message: Option<&str>) {
        self.state().unavailable = message.map(str::to_string);
    }

    /// Answer queries without a body
    pub fn set_empty_responses(&self, empty: bool) {
        self.state().empty_responses = empty;
    }

    /// Number of calls served for an operation name such as
    /// `"delete_documents"`
    pub fn call_count(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn documents(&self, index: &str) -> Vec<IndexDocument> {
        self.state()
            .indexes
            .get(index)
            .map(|i| i.documents.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn definition(&self, index: &str) -> Option<IndexDefinition> {
        self.state().indexes.get(index).map(|i| i.definition.clone())
    }
}

fn index_mut<'a>(state: &'a mut State, index: &str) -> Result<&'a mut StoredIndex> {
    state
        .indexes
        .get_mut(index)
        .ok_or_else(|| BlobSearchError::IndexNotFound(index.to_string()))
}

/// Occurrences of the query terms in the searchable fields
fn score(document: &IndexDocument, terms: &[String]) -> usize {
    let haystack = format!("{} {} {}", document.body, document.tags, document.title).to_lowercase();
    let words: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    terms
        .iter()
        .map(|term| words.iter().filter(|w| *w == term).count())
        .sum()
}

#[async_trait]
impl SearchIndexService for MemorySearchService {
    async fn create_or_update_index(&self, definition: &IndexDefinition) -> Result<()> {
        let mut state = self.enter("create_or_update_index")?;
        state
            .indexes
            .entry(definition.name.clone())
            .and_modify(|i| i.definition = definition.clone())
            .or_insert_with(|| StoredIndex {
                definition: definition.clone(),
                documents: BTreeMap::new(),
            });
        Ok(())
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        let state = self.enter("list_indexes")?;
        Ok(state.indexes.keys().cloned().collect())
    }

    async fn document_count(&self, index: &str) -> Result<u64> {
        let mut state = self.enter("document_count")?;
        Ok(index_mut(&mut state, index)?.documents.len() as u64)
    }

    async fn upload_documents(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<Vec<IndexingStatus>> {
        let mut state = self.enter("upload_documents")?;
        if let Some(message) = documents
            .iter()
            .find_map(|d| state.upload_errors.get(&d.id).cloned())
        {
            return Err(BlobSearchError::Transport(message));
        }

        let rejected = state.rejected.clone();
        let stored = index_mut(&mut state, index)?;
        let mut statuses = Vec::with_capacity(documents.len());
        for document in documents {
            if let Some(message) = rejected.get(&document.id) {
                statuses.push(IndexingStatus::failed(&document.id, 400, message));
                continue;
            }
            let existed = stored
                .documents
                .insert(document.id.clone(), document.clone())
                .is_some();
            statuses.push(IndexingStatus::ok(&document.id, if existed { 200 } else { 201 }));
        }
        Ok(statuses)
    }

    async fn delete_documents(
        &self,
        index: &str,
        key_field: &str,
        keys: &[String],
        throw_on_any_error: bool,
    ) -> Result<Vec<IndexingStatus>> {
        let mut state = self.enter("delete_documents")?;
        let stored = index_mut(&mut state, index)?;
        if stored.definition.key_field().map(|f| f.name.as_str()) != Some(key_field) {
            return Err(BlobSearchError::InvalidQuery(format!(
                "'{key_field}' is not the key field of {index}"
            )));
        }

        // Deleting a missing key succeeds, as on the real service
        let statuses = keys
            .iter()
            .map(|key| {
                stored.documents.remove(key);
                IndexingStatus::ok(key, 200)
            })
            .collect();
        check_statuses(statuses, throw_on_any_error)
    }

    async fn query(&self, index: &str, request: &QueryRequest) -> Result<Option<QueryResponse>> {
        let mut state = self.enter("query")?;
        let empty = state.empty_responses;
        let stored = index_mut(&mut state, index)?;
        if empty {
            return Ok(None);
        }

        let match_all = request.search.trim() == "*";
        let terms: Vec<String> = request
            .search
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let mut hits: Vec<ScoredDocument> = stored
            .documents
            .values()
            .filter(|d| request.filter.as_ref().map_or(true, |f| f.matches(d)))
            .filter_map(|d| {
                let score = if match_all { 1 } else { score(d, &terms) };
                (score > 0).then(|| ScoredDocument {
                    score: Some(score as f64),
                    document: d.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });

        let total_count = hits.len() as u64;
        if let Some(top) = request.top {
            hits.truncate(top);
        }

        Ok(Some(QueryResponse {
            total_count: Some(total_count),
            results: hits,
        }))
    }
}
