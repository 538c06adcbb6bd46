//! blobsearch - blob-backed index storage and per-tenant search
//!
//! Two halves that share one error type and one configuration:
//!
//! - **core::storage**: treats a blob container as a random-access,
//!   lockable directory for a full-text index. Files are read in ranged
//!   chunks and written through a local buffer; writers exclude each other
//!   with blob leases.
//! - **core::search** and **core::services**: one index per tenant, served
//!   either by a remote search service over REST or by local Tantivy
//!   indexes, behind a search engine service that never lets a transport
//!   failure escape a read or write.
//!
//! The **cli** module is the admin command-line adapter over `core`.

pub mod cli;
pub mod core;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{BlobSearchError, LeaseError, Result};
pub use core::services::{SearchEngineService, Services};
pub use core::storage::{DirectorySettings, LeaseLock, Lock, ObjectStoreDirectory};
pub use core::types::*;
