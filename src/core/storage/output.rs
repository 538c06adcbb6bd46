//! Buffered writer over a blob.
//!
//! Blobs cannot be patched in place, so every flush downloads the whole
//! object, splices the pending bytes in at the write position and uploads
//! the result. The upload is conditional on the ETag seen at download
//! time: a concurrent writer makes the flush fail with a conflict instead
//! of silently losing one of the updates.

use crate::core::error::{BlobSearchError, Result};
use crate::core::storage::blob::BlobHandle;
use crate::core::storage::container::UploadCondition;
use bytes::Bytes;

/// Default size of the local write buffer
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Sequential writer with seek support over one blob
#[derive(Debug)]
pub struct BlobOutput {
    blob: BlobHandle,
    buffer_size: usize,
    pending: Vec<u8>,
    /// Blob offset where `pending[0]` will land
    buffer_start: u64,
}

impl BlobOutput {
    /// Create a writer, creating an empty blob if none exists
    pub async fn create(blob: BlobHandle, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(BlobSearchError::invalid_argument(
                "buffer_size",
                "buffer size must be greater than zero",
            ));
        }

        blob.create_if_not_exists().await?;

        Ok(Self {
            blob,
            buffer_size,
            pending: Vec::with_capacity(buffer_size),
            buffer_start: 0,
        })
    }

    pub fn name(&self) -> &str {
        self.blob.name()
    }

    /// Logical write position, including bytes not yet flushed
    pub fn file_pointer(&self) -> u64 {
        self.buffer_start + self.pending.len() as u64
    }

    /// Length of the blob as stored; unflushed bytes are not counted
    pub async fn length(&self) -> Result<u64> {
        self.blob.size_bytes().await
    }

    pub async fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.pending.push(byte);
        if self.pending.len() >= self.buffer_size {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() >= self.buffer_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Push pending bytes to the store
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        if let Err(e) = self.flush_buffer(self.buffer_start, &pending).await {
            // Keep the bytes so a later flush can retry
            self.pending = pending;
            return Err(e);
        }
        self.buffer_start += pending.len() as u64;
        self.pending = Vec::with_capacity(self.buffer_size);
        Ok(())
    }

    /// Flush, then move the write position
    pub async fn seek(&mut self, position: u64) -> Result<()> {
        self.flush().await?;
        self.buffer_start = position;
        Ok(())
    }

    /// Flush and consume the writer
    pub async fn close(mut self) -> Result<()> {
        self.flush().await
    }

    async fn flush_buffer(&self, position: u64, bytes: &[u8]) -> Result<()> {
        let content = self.blob.download().await?;

        let start = usize::try_from(position).map_err(|_| {
            BlobSearchError::invalid_argument("position", format!("{position} is out of range"))
        })?;
        let end = start + bytes.len();

        let mut data = content.data.to_vec();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);

        tracing::debug!(
            "Flushing {} bytes to {} at offset {} ({} bytes total)",
            bytes.len(),
            self.blob.name(),
            position,
            data.len()
        );

        self.blob
            .upload(Bytes::from(data), UploadCondition::IfMatch(content.etag))
            .await?;
        Ok(())
    }
}

impl Drop for BlobOutput {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                "Dropping output for {} with {} unflushed bytes",
                self.blob.name(),
                self.pending.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::container::BlobContainer;
    use crate::core::storage::memory::MemoryContainer;
    use std::sync::Arc;

    async fn output(buffer_size: usize) -> (Arc<MemoryContainer>, BlobOutput) {
        let container = Arc::new(MemoryContainer::new("out"));
        container.create_if_not_exists().await.unwrap();
        let blob = BlobHandle::new(container.clone(), "seg").unwrap();
        let output = BlobOutput::create(blob, buffer_size).await.unwrap();
        (container, output)
    }

    async fn content(container: &MemoryContainer) -> Vec<u8> {
        container.download("seg").await.unwrap().data.to_vec()
    }

    #[tokio::test]
    async fn test_zero_buffer_size_rejected() {
        let container = Arc::new(MemoryContainer::new("out"));
        container.create_if_not_exists().await.unwrap();
        let blob = BlobHandle::new(container, "seg").unwrap();
        assert!(BlobOutput::create(blob, 0).await.unwrap_err().is_precondition());
    }

    #[tokio::test]
    async fn test_bytes_stay_local_until_flush() {
        let (container, mut output) = output(64).await;
        output.write_bytes(b"abc").await.unwrap();
        assert_eq!(output.file_pointer(), 3);
        assert!(content(&container).await.is_empty());

        output.flush().await.unwrap();
        assert_eq!(content(&container).await, b"abc");
        assert_eq!(output.length().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_consecutive_flushes_append() {
        let (container, mut output) = output(2).await;
        output.write_bytes(b"ab").await.unwrap();
        output.write_bytes(b"cd").await.unwrap();
        output.write_byte(b'e').await.unwrap();
        output.close().await.unwrap();

        assert_eq!(content(&container).await, b"abcde");
    }

    #[tokio::test]
    async fn test_seek_overwrites_in_place() {
        let (container, mut output) = output(64).await;
        output.write_bytes(b"hello world").await.unwrap();
        output.seek(0).await.unwrap();
        output.write_bytes(b"J").await.unwrap();
        output.close().await.unwrap();

        assert_eq!(content(&container).await, b"Jello world");
    }

    #[tokio::test]
    async fn test_seek_past_end_zero_fills() {
        let (container, mut output) = output(64).await;
        output.seek(3).await.unwrap();
        output.write_bytes(b"x").await.unwrap();
        output.close().await.unwrap();

        assert_eq!(content(&container).await, vec![0, 0, 0, b'x']);
    }
}
