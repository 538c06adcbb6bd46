//! Remote blob container abstraction.
//!
//! A container is a flat namespace of named blobs. Blobs are replaced
//! whole; there is no append and no byte-range write. Leases give one
//! holder a time-bounded exclusive claim on a blob.

use crate::core::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lease state of a blob as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseState {
    Available,
    Leased,
    Breaking,
    Broken,
    Expired,
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeaseState::Available => "available",
            LeaseState::Leased => "leased",
            LeaseState::Breaking => "breaking",
            LeaseState::Broken => "broken",
            LeaseState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Blob properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub lease_state: LeaseState,
}

/// Full blob content together with the version it was read at
#[derive(Debug, Clone)]
pub struct BlobContent {
    pub data: Bytes,
    pub etag: String,
}

/// Write precondition for an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadCondition {
    /// Replace any existing content
    Overwrite,
    /// Fail with a conflict if the blob already exists
    IfNotExists,
    /// Fail with a conflict unless the current ETag matches
    IfMatch(String),
}

/// Remote object store container
///
/// Missing blobs surface as `BlobSearchError::NotFound`; failed
/// preconditions and lease clashes as `BlobSearchError::Conflict`.
#[async_trait]
pub trait BlobContainer: Send + Sync {
    /// Container name (for logging)
    fn name(&self) -> &str;

    /// Create the container itself if it does not exist
    async fn create_if_not_exists(&self) -> Result<()>;

    /// List the names of all blobs in the container
    async fn list(&self) -> Result<Vec<String>>;

    async fn exists(&self, blob: &str) -> Result<bool>;

    async fn properties(&self, blob: &str) -> Result<BlobProperties>;

    /// Download the whole blob
    async fn download(&self, blob: &str) -> Result<BlobContent>;

    /// Read at most `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes at the end of the blob and an empty buffer when
    /// `offset` is at or past the end.
    async fn read_range(&self, blob: &str, offset: u64, len: usize) -> Result<Bytes>;

    /// Upload the whole blob, returning the new ETag
    async fn upload(&self, blob: &str, data: Bytes, condition: UploadCondition) -> Result<String>;

    /// Delete the blob, returning whether it existed
    async fn delete_if_exists(&self, blob: &str) -> Result<bool>;

    /// Acquire a new lease, returning its token
    async fn acquire_lease(&self, blob: &str, duration: Duration) -> Result<String>;

    /// Renew a lease held under `lease_id`, returning its token
    async fn renew_lease(&self, blob: &str, lease_id: &str) -> Result<String>;

    async fn release_lease(&self, blob: &str, lease_id: &str) -> Result<()>;

    /// Break the current lease regardless of its holder
    async fn break_lease(&self, blob: &str) -> Result<()>;
}
