//! Handle on a single remote blob.
//!
//! Thin capability wrapper around one named object in a container, plus
//! the lease acquire and release algorithms used by [`LeaseLock`].
//!
//! [`LeaseLock`]: crate::core::storage::LeaseLock

use crate::core::error::{BlobSearchError, LeaseError, Result};
use crate::core::storage::container::{
    BlobContainer, BlobContent, BlobProperties, LeaseState, UploadCondition,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Handle on one named blob in a container
#[derive(Clone)]
pub struct BlobHandle {
    container: Arc<dyn BlobContainer>,
    name: String,
}

impl std::fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobHandle")
            .field("container", &self.container.name())
            .field("name", &self.name)
            .finish()
    }
}

/// Modification time reported for blobs that do not exist
pub fn missing_blob_millis() -> i64 {
    DateTime::<Utc>::MIN_UTC.timestamp_millis()
}

impl BlobHandle {
    /// Create a handle; no remote call is made
    pub fn new(container: Arc<dyn BlobContainer>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BlobSearchError::invalid_argument(
                "name",
                "blob name cannot be empty or blank",
            ));
        }
        Ok(Self { container, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn exists(&self) -> Result<bool> {
        self.container.exists(&self.name).await
    }

    /// Upload an empty blob unless one already exists
    pub async fn create_if_not_exists(&self) -> Result<()> {
        if self.exists().await? {
            return Ok(());
        }

        match self
            .container
            .upload(&self.name, Bytes::new(), UploadCondition::IfNotExists)
            .await
        {
            Ok(_) => Ok(()),
            // Someone else created it between the check and the upload
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn properties(&self) -> Result<BlobProperties> {
        self.container.properties(&self.name).await
    }

    /// Size in bytes; `NotFound` if the blob is absent
    pub async fn size_bytes(&self) -> Result<u64> {
        Ok(self.properties().await?.content_length)
    }

    /// Last modification time in Unix milliseconds, or
    /// [`missing_blob_millis`] if the blob is absent
    pub async fn last_modified_millis(&self) -> Result<i64> {
        match self.properties().await {
            Ok(properties) => Ok(properties.last_modified.timestamp_millis()),
            Err(e) if e.is_not_found() => Ok(missing_blob_millis()),
            Err(e) => Err(e),
        }
    }

    pub async fn lease_state(&self) -> Result<LeaseState> {
        Ok(self.properties().await?.lease_state)
    }

    /// One ranged read of at most `max_len` bytes from `offset`
    pub async fn read_from(&self, offset: u64, max_len: usize) -> Result<Bytes> {
        self.container.read_range(&self.name, offset, max_len).await
    }

    /// Download the whole blob with its current ETag
    pub async fn download(&self) -> Result<BlobContent> {
        self.container.download(&self.name).await
    }

    /// Replace the blob content. With `allow_overwrite == false` an
    /// existing blob is a conflict.
    pub async fn overwrite(&self, data: Bytes, allow_overwrite: bool) -> Result<String> {
        let condition = if allow_overwrite {
            UploadCondition::Overwrite
        } else {
            UploadCondition::IfNotExists
        };
        self.upload(data, condition).await
    }

    pub async fn upload(&self, data: Bytes, condition: UploadCondition) -> Result<String> {
        self.container.upload(&self.name, data, condition).await
    }

    /// Delete the blob; a missing blob is not an error
    pub async fn delete_if_exists(&self) -> Result<bool> {
        self.container.delete_if_exists(&self.name).await
    }

    /// Acquire, renew or take over the lease on this blob.
    ///
    /// Never blocks and never retries: a live lease held by anyone is
    /// reported as [`LeaseError::Contended`].
    pub async fn obtain_lease(
        &self,
        duration: Duration,
        previous: Option<&str>,
    ) -> std::result::Result<String, LeaseError> {
        let state = self.lease_state().await?;

        match state {
            LeaseState::Leased => {
                return Err(LeaseError::Contended {
                    name: self.name.clone(),
                });
            }
            LeaseState::Breaking | LeaseState::Broken => {
                // Drop whatever stale claim is left before taking a new one
                if let Err(e) = self.release_lease(previous).await {
                    tracing::warn!(
                        "Could not release stale lease on {} ({}): {}",
                        self.name,
                        state,
                        e
                    );
                }
            }
            LeaseState::Available | LeaseState::Expired => {}
        }

        let token = match previous {
            Some(lease_id) if state == LeaseState::Expired && !lease_id.trim().is_empty() => {
                tracing::debug!("Renewing expired lease on {}", self.name);
                self.container.renew_lease(&self.name, lease_id).await
            }
            _ => self.container.acquire_lease(&self.name, duration).await,
        };

        match token {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            Ok(_) => Err(LeaseError::Rejected {
                name: self.name.clone(),
                message: "store returned an empty lease id".to_string(),
            }),
            Err(BlobSearchError::Conflict { message, .. }) => Err(LeaseError::Rejected {
                name: self.name.clone(),
                message,
            }),
            Err(e) => Err(LeaseError::Transport(e)),
        }
    }

    /// Release the lease held under `lease_id`. Releasing an available
    /// blob is a logged no-op.
    pub async fn release_lease(&self, lease_id: Option<&str>) -> std::result::Result<(), LeaseError> {
        let state = self.lease_state().await?;
        if state == LeaseState::Available {
            tracing::warn!(
                "Requested release of lease on available blob {}, skipping",
                self.name
            );
            return Ok(());
        }

        let lease_id = match lease_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(LeaseError::Rejected {
                    name: self.name.clone(),
                    message: format!("no lease id held (state: {state})"),
                });
            }
        };

        match self.container.release_lease(&self.name, lease_id).await {
            Ok(()) => Ok(()),
            Err(BlobSearchError::Conflict { message, .. }) => Err(LeaseError::Rejected {
                name: self.name.clone(),
                message,
            }),
            Err(e) => Err(LeaseError::Transport(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::memory::MemoryContainer;

    async fn handle(name: &str) -> (Arc<MemoryContainer>, BlobHandle) {
        let container = Arc::new(MemoryContainer::new("blobs"));
        container.create_if_not_exists().await.unwrap();
        let handle = BlobHandle::new(container.clone(), name).unwrap();
        (container, handle)
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let container = Arc::new(MemoryContainer::new("blobs"));
        let err = BlobHandle::new(container, "  ").unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_create_if_not_exists_is_idempotent() {
        let (_container, blob) = handle("a").await;
        blob.create_if_not_exists().await.unwrap();
        blob.overwrite(Bytes::from_static(b"data"), true).await.unwrap();
        blob.create_if_not_exists().await.unwrap();
        assert_eq!(blob.size_bytes().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_blob_modified_sentinel() {
        let (_container, blob) = handle("missing").await;
        assert_eq!(
            blob.last_modified_millis().await.unwrap(),
            missing_blob_millis()
        );
        assert!(blob.size_bytes().await.unwrap_err().is_not_found());
    }

    /// Reports every blob as present, then loses it before any other call
    struct VanishingContainer;

    #[async_trait::async_trait]
    impl BlobContainer for VanishingContainer {
        fn name(&self) -> &str {
            "vanishing"
        }

        async fn create_if_not_exists(&self) -> Result<()> {
            Ok(())
        }

        async fn list(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn exists(&self, _blob: &str) -> Result<bool> {
            Ok(true)
        }

        async fn properties(&self, blob: &str) -> Result<BlobProperties> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn download(&self, blob: &str) -> Result<BlobContent> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn read_range(&self, blob: &str, _offset: u64, _len: usize) -> Result<Bytes> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn upload(&self, blob: &str, _data: Bytes, _condition: UploadCondition) -> Result<String> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn delete_if_exists(&self, _blob: &str) -> Result<bool> {
            Ok(false)
        }

        async fn acquire_lease(&self, blob: &str, _duration: Duration) -> Result<String> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn renew_lease(&self, blob: &str, _lease_id: &str) -> Result<String> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn release_lease(&self, blob: &str, _lease_id: &str) -> Result<()> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }

        async fn break_lease(&self, blob: &str) -> Result<()> {
            Err(BlobSearchError::NotFound(blob.to_string()))
        }
    }

    #[tokio::test]
    async fn test_blob_deleted_during_stat_gives_sentinel() {
        let blob = BlobHandle::new(Arc::new(VanishingContainer), "segments_3").unwrap();
        assert!(blob.exists().await.unwrap());
        assert_eq!(
            blob.last_modified_millis().await.unwrap(),
            missing_blob_millis()
        );
    }

    #[tokio::test]
    async fn test_overwrite_without_permission_conflicts() {
        let (_container, blob) = handle("a").await;
        blob.create_if_not_exists().await.unwrap();
        let err = blob
            .overwrite(Bytes::from_static(b"x"), false)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_delete_if_exists() {
        let (_container, blob) = handle("a").await;
        assert!(!blob.delete_if_exists().await.unwrap());
        blob.create_if_not_exists().await.unwrap();
        assert!(blob.delete_if_exists().await.unwrap());
        assert!(!blob.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_obtain_lease_contended() {
        let (_container, blob) = handle("write.lock").await;
        blob.create_if_not_exists().await.unwrap();

        let token = blob
            .obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap();
        assert!(!token.is_empty());

        let err = blob
            .obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap_err();
        assert!(err.is_contention());
    }

    #[tokio::test]
    async fn test_obtain_lease_renews_expired_token() {
        let (container, blob) = handle("write.lock").await;
        blob.create_if_not_exists().await.unwrap();

        let token = blob
            .obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap();
        container.expire_lease("write.lock").unwrap();

        let renewed = blob
            .obtain_lease(Duration::from_secs(30), Some(&token))
            .await
            .unwrap();
        assert_eq!(renewed, token);
        assert_eq!(blob.lease_state().await.unwrap(), LeaseState::Leased);
    }

    #[tokio::test]
    async fn test_obtain_lease_takes_over_broken_lease() {
        let (container, blob) = handle("write.lock").await;
        blob.create_if_not_exists().await.unwrap();
        blob.obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap();
        container.break_lease("write.lock").await.unwrap();

        let token = blob
            .obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap();
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_release_on_available_is_noop() {
        let (_container, blob) = handle("write.lock").await;
        blob.create_if_not_exists().await.unwrap();
        blob.release_lease(None).await.unwrap();
        assert_eq!(blob.lease_state().await.unwrap(), LeaseState::Available);
    }

    #[tokio::test]
    async fn test_release_with_wrong_token_rejected() {
        let (_container, blob) = handle("write.lock").await;
        blob.create_if_not_exists().await.unwrap();
        blob.obtain_lease(Duration::from_secs(30), None)
            .await
            .unwrap();

        let err = blob.release_lease(Some("bogus")).await.unwrap_err();
        assert!(matches!(err, LeaseError::Rejected { .. }));
    }
}
