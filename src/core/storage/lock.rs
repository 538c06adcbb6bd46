//! Lease-based distributed lock.
//!
//! A [`LeaseLock`] guards one blob name across processes using the
//! store's lease primitive. Every call makes at most one attempt; backoff
//! and retry loops belong to the caller.

use crate::core::error::{BlobSearchError, LeaseError, Result};
use crate::core::storage::blob::BlobHandle;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Mutual-exclusion contract expected by an index writer
#[async_trait]
pub trait Lock: Send + Sync {
    /// Try once to obtain the lock
    async fn obtain(&self) -> bool;

    /// Release the lock. Never fails; problems are logged.
    async fn release(&self);

    fn is_locked(&self) -> bool;
}

/// Lock backed by a lease on a single blob
pub struct LeaseLock {
    blob: BlobHandle,
    duration: Duration,
    lease_id: Mutex<Option<String>>,
}

impl std::fmt::Debug for LeaseLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseLock")
            .field("blob", &self.blob.name())
            .field("duration", &self.duration)
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl LeaseLock {
    /// Create a lock on `blob`, creating the blob if needed
    pub async fn new(blob: BlobHandle, duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(BlobSearchError::invalid_argument(
                "duration",
                "lease duration must be greater than zero",
            ));
        }

        blob.create_if_not_exists().await?;

        Ok(Self {
            blob,
            duration,
            lease_id: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        self.blob.name()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Currently held lease token, if any
    pub fn lease_id(&self) -> Option<String> {
        self.lease_id.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_lease_id(&self, value: Option<String>) {
        match self.lease_id.lock() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// Obtain the lock, reporting why it could not be obtained.
    ///
    /// State is only updated on success.
    pub async fn try_obtain(&self) -> std::result::Result<(), LeaseError> {
        let previous = self.lease_id();
        let token = self
            .blob
            .obtain_lease(self.duration, previous.as_deref())
            .await?;
        self.set_lease_id(Some(token));
        Ok(())
    }
}

#[async_trait]
impl Lock for LeaseLock {
    async fn obtain(&self) -> bool {
        match self.try_obtain().await {
            Ok(()) => true,
            Err(LeaseError::Contended { name }) => {
                tracing::error!("Requested lock on unavailable blob {} (state: leased)", name);
                false
            }
            Err(LeaseError::Rejected { name, message }) => {
                tracing::error!("Lease on {} was rejected: {}", name, message);
                false
            }
            Err(LeaseError::Transport(e)) => {
                tracing::error!(
                    "An error occurred while acquiring lease on {}: {}",
                    self.name(),
                    e
                );
                false
            }
        }
    }

    async fn release(&self) {
        let lease_id = self.lease_id();
        match self.blob.release_lease(lease_id.as_deref()).await {
            Ok(()) => self.set_lease_id(None),
            Err(e) => {
                tracing::error!(
                    "An error occurred while releasing lease on {}: {}",
                    self.name(),
                    e
                );
            }
        }
    }

    fn is_locked(&self) -> bool {
        self.lease_id()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::container::{BlobContainer, LeaseState};
    use crate::core::storage::memory::MemoryContainer;
    use std::sync::Arc;

    async fn container() -> Arc<MemoryContainer> {
        let container = Arc::new(MemoryContainer::new("locks"));
        container.create_if_not_exists().await.unwrap();
        container
    }

    async fn lease_lock(container: &Arc<MemoryContainer>, name: &str) -> LeaseLock {
        let blob = BlobHandle::new(container.clone(), name).unwrap();
        LeaseLock::new(blob, Duration::from_secs(30)).await.unwrap()
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let container = container().await;
        let blob = BlobHandle::new(container, "write.lock").unwrap();
        let err = LeaseLock::new(blob, Duration::ZERO).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_new_lock_is_unlocked_and_blob_created() {
        let container = container().await;
        let lock = lease_lock(&container, "write.lock").await;
        assert!(!lock.is_locked());
        assert!(lock.lease_id().is_none());
        assert!(container.exists("write.lock").await.unwrap());
    }

    #[tokio::test]
    async fn test_obtain_and_release() {
        let container = container().await;
        let lock = lease_lock(&container, "write.lock").await;

        assert!(lock.obtain().await);
        assert!(lock.is_locked());

        lock.release().await;
        assert!(!lock.is_locked());
        let props = container.properties("write.lock").await.unwrap();
        assert_eq!(props.lease_state, LeaseState::Available);
    }

    #[tokio::test]
    async fn test_second_holder_is_refused() {
        let container = container().await;
        let first = lease_lock(&container, "write.lock").await;
        let second = lease_lock(&container, "write.lock").await;

        assert!(first.obtain().await);
        assert!(!second.obtain().await);
        assert!(!second.is_locked());

        let err = second.try_obtain().await.unwrap_err();
        assert!(err.is_contention());
    }

    #[tokio::test]
    async fn test_release_when_unlocked_is_harmless() {
        let container = container().await;
        let lock = lease_lock(&container, "write.lock").await;
        lock.release().await;
        lock.release().await;
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_failed_release_keeps_token() {
        let container = container().await;
        let first = lease_lock(&container, "write.lock").await;
        let second = lease_lock(&container, "write.lock").await;

        assert!(first.obtain().await);
        // The second lock holds no token, so its release is rejected
        second.release().await;
        assert!(first.is_locked());
        let props = container.properties("write.lock").await.unwrap();
        assert_eq!(props.lease_state, LeaseState::Leased);
    }

    #[tokio::test]
    async fn test_expired_lease_is_renewed() {
        let container = container().await;
        let lock = lease_lock(&container, "write.lock").await;
        assert!(lock.obtain().await);
        let token = lock.lease_id().unwrap();

        container.expire_lease("write.lock").unwrap();
        assert!(lock.obtain().await);
        assert_eq!(lock.lease_id().unwrap(), token);
    }
}
