//! Core domain logic
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **logging**: Tracing subscriber setup
//! - **types**: Entries, results and indexing errors
//! - **xdg**: XDG directory handling
//! - **storage**: Blob-backed index directory, lease locks, local Tantivy indexes
//! - **search**: Tenant index factories and search clients
//! - **services**: Search engine orchestration and service container

pub mod config;
pub mod error;
pub mod logging;
pub mod search;
pub mod services;
pub mod storage;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{BlobSearchError, LeaseError, Result};
pub use services::{IndexedSearchEngine, SearchEngineService, Services};
