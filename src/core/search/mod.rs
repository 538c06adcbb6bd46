//! Tenant-scoped full-text search.
//!
//! Each tenant owns one index named `index-{tenant}`. A [`SearchClient`]
//! operates on one index; an [`IndexFactory`] creates indexes and hands
//! out cached clients. Remote clients speak the search service's REST
//! protocol, local clients wrap a Tantivy index.

pub mod backend;
pub mod client;
pub mod document;
pub mod factory;
pub mod http;
pub mod local;
pub mod memory;
pub mod related;
pub mod rest;

pub use backend::{IndexingStatus, QueryRequest, QueryResponse, SearchIndexService};
pub use client::{RemoteSearchClient, SearchClient};
pub use document::{index_name, DocumentFilter, IndexDefinition, IndexDocument};
pub use factory::{
    ClientCache, IndexFactory, LocalIndexFactory, RelatedSettings, RemoteIndexFactory,
};
pub use http::{HttpService, ReqwestHttpService};
pub use local::LocalSearchClient;
pub use memory::MemorySearchService;
pub use related::RelatedContentClient;
pub use rest::RestSearchService;
