//! In-process blob container.
//!
//! Implements the full container contract, including leases with expiry
//! and breaking, ETags and modification times. Used by tests and by
//! hosts that embed the index in a single process.

use crate::core::error::{BlobSearchError, Result};
use crate::core::storage::container::{
    BlobContainer, BlobContent, BlobProperties, LeaseState, UploadCondition,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Lease {
    id: String,
    duration: Duration,
    expires_at: Instant,
    /// Set once the lease has been broken; the lease is `Breaking` until then
    broken_at: Option<Instant>,
}

impl Lease {
    fn state(&self, now: Instant) -> LeaseState {
        match self.broken_at {
            Some(at) if now < at => LeaseState::Breaking,
            Some(_) => LeaseState::Broken,
            None if now >= self.expires_at => LeaseState::Expired,
            None => LeaseState::Leased,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    last_modified: DateTime<Utc>,
    version: u64,
    lease: Option<Lease>,
}

impl StoredBlob {
    fn etag(&self) -> String {
        format!("\"0x{:016X}\"", self.version)
    }

    fn lease_state(&self, now: Instant) -> LeaseState {
        self.lease
            .as_ref()
            .map_or(LeaseState::Available, |lease| lease.state(now))
    }
}

#[derive(Debug, Default)]
struct State {
    created: bool,
    blobs: BTreeMap<String, StoredBlob>,
    next_version: u64,
    next_lease: u64,
}

impl State {
    fn ensure_created(&self, container: &str) -> Result<()> {
        if self.created {
            Ok(())
        } else {
            Err(BlobSearchError::NotFound(format!("container '{container}'")))
        }
    }

    fn blob(&self, container: &str, name: &str) -> Result<&StoredBlob> {
        self.ensure_created(container)?;
        self.blobs
            .get(name)
            .ok_or_else(|| BlobSearchError::NotFound(name.to_string()))
    }

    fn blob_mut(&mut self, container: &str, name: &str) -> Result<&mut StoredBlob> {
        self.ensure_created(container)?;
        self.blobs
            .get_mut(name)
            .ok_or_else(|| BlobSearchError::NotFound(name.to_string()))
    }

    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

/// In-memory blob container with lease semantics
#[derive(Debug)]
pub struct MemoryContainer {
    name: String,
    state: Mutex<State>,
}

impl MemoryContainer {
    /// Create a container handle; the container itself starts out missing
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| BlobSearchError::Storage("memory container state poisoned".to_string()))
    }

    fn conflict(name: &str, message: impl Into<String>) -> BlobSearchError {
        BlobSearchError::Conflict {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Force the current lease on `blob` to expire now
    pub fn expire_lease(&self, blob: &str) -> Result<()> {
        let mut state = self.lock()?;
        let stored = state.blob_mut(&self.name, blob)?;
        if let Some(lease) = stored.lease.as_mut() {
            lease.expires_at = Instant::now();
        }
        Ok(())
    }

    /// Break the current lease, keeping it in `Breaking` for `period`
    pub fn break_lease_with_period(&self, blob: &str, period: Duration) -> Result<()> {
        let mut state = self.lock()?;
        let stored = state.blob_mut(&self.name, blob)?;
        match stored.lease.as_mut() {
            Some(lease) => {
                lease.broken_at = Some(Instant::now() + period);
                Ok(())
            }
            None => Err(Self::conflict(blob, "there is no lease to break")),
        }
    }
}

#[async_trait]
impl BlobContainer for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_if_not_exists(&self) -> Result<()> {
        self.lock()?.created = true;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let state = self.lock()?;
        state.ensure_created(&self.name)?;
        Ok(state.blobs.keys().cloned().collect())
    }

    async fn exists(&self, blob: &str) -> Result<bool> {
        let state = self.lock()?;
        Ok(state.created && state.blobs.contains_key(blob))
    }

    async fn properties(&self, blob: &str) -> Result<BlobProperties> {
        let state = self.lock()?;
        let stored = state.blob(&self.name, blob)?;
        Ok(BlobProperties {
            content_length: stored.data.len() as u64,
            last_modified: stored.last_modified,
            etag: stored.etag(),
            lease_state: stored.lease_state(Instant::now()),
        })
    }

    async fn download(&self, blob: &str) -> Result<BlobContent> {
        let state = self.lock()?;
        let stored = state.blob(&self.name, blob)?;
        Ok(BlobContent {
            data: stored.data.clone(),
            etag: stored.etag(),
        })
    }

    async fn read_range(&self, blob: &str, offset: u64, len: usize) -> Result<Bytes> {
        let state = self.lock()?;
        let stored = state.blob(&self.name, blob)?;
        let size = stored.data.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(size);
        let end = start.saturating_add(len).min(size);
        Ok(stored.data.slice(start..end))
    }

    async fn upload(&self, blob: &str, data: Bytes, condition: UploadCondition) -> Result<String> {
        let mut state = self.lock()?;
        state.ensure_created(&self.name)?;

        let existing = state.blobs.get(blob);
        match (&condition, existing) {
            (UploadCondition::IfNotExists, Some(_)) => {
                return Err(Self::conflict(blob, "blob already exists"));
            }
            (UploadCondition::IfMatch(etag), Some(stored)) if stored.etag() != *etag => {
                return Err(Self::conflict(
                    blob,
                    format!("etag {} does not match {}", etag, stored.etag()),
                ));
            }
            (UploadCondition::IfMatch(_), None) => {
                return Err(Self::conflict(blob, "blob was deleted concurrently"));
            }
            _ => {}
        }

        // Writes keep the lease; leases only guard lock acquisition
        let lease = existing.and_then(|stored| stored.lease.clone());
        let version = state.bump_version();
        let stored = StoredBlob {
            data,
            last_modified: Utc::now(),
            version,
            lease,
        };
        let etag = stored.etag();
        state.blobs.insert(blob.to_string(), stored);
        Ok(etag)
    }

    async fn delete_if_exists(&self, blob: &str) -> Result<bool> {
        let mut state = self.lock()?;
        if !state.created {
            return Ok(false);
        }
        Ok(state.blobs.remove(blob).is_some())
    }

    async fn acquire_lease(&self, blob: &str, duration: Duration) -> Result<String> {
        let mut state = self.lock()?;
        state.next_lease += 1;
        let id = format!("lease-{:08x}", state.next_lease);

        let now = Instant::now();
        let stored = state.blob_mut(&self.name, blob)?;
        match stored.lease_state(now) {
            LeaseState::Leased | LeaseState::Breaking => {
                Err(Self::conflict(blob, "there is already a lease present"))
            }
            LeaseState::Available | LeaseState::Expired | LeaseState::Broken => {
                stored.lease = Some(Lease {
                    id: id.clone(),
                    duration,
                    expires_at: now + duration,
                    broken_at: None,
                });
                Ok(id)
            }
        }
    }

    async fn renew_lease(&self, blob: &str, lease_id: &str) -> Result<String> {
        let mut state = self.lock()?;
        let now = Instant::now();
        let stored = state.blob_mut(&self.name, blob)?;
        let state_now = stored.lease_state(now);
        match stored.lease.as_mut() {
            Some(lease)
                if lease.id == lease_id
                    && matches!(state_now, LeaseState::Leased | LeaseState::Expired) =>
            {
                lease.expires_at = now + lease.duration;
                Ok(lease.id.clone())
            }
            _ => Err(Self::conflict(blob, "lease id does not match or lease was lost")),
        }
    }

    async fn release_lease(&self, blob: &str, lease_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let stored = state.blob_mut(&self.name, blob)?;
        match stored.lease.as_ref() {
            Some(lease) if lease.id == lease_id => {
                stored.lease = None;
                Ok(())
            }
            Some(_) => Err(Self::conflict(blob, "lease id does not match")),
            None => Err(Self::conflict(blob, "there is no lease to release")),
        }
    }

    async fn break_lease(&self, blob: &str) -> Result<()> {
        self.break_lease_with_period(blob, Duration::ZERO)
    }
}
