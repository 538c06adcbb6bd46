//! Chunked random-access reader over a blob.

use crate::core::error::{BlobSearchError, Result};
use crate::core::storage::blob::BlobHandle;

/// Default maximum bytes fetched per ranged read
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Seekable reader over one blob.
///
/// Keeps only a logical position; every read goes to the container, so
/// length and content always reflect the store.
#[derive(Debug)]
pub struct BlobInput {
    blob: BlobHandle,
    chunk_size: usize,
    position: u64,
}

impl BlobInput {
    /// Open a reader, creating an empty blob if none exists
    pub async fn open(blob: BlobHandle, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(BlobSearchError::invalid_argument(
                "chunk_size",
                "chunk size must be greater than zero",
            ));
        }

        blob.create_if_not_exists().await?;

        Ok(Self {
            blob,
            chunk_size,
            position: 0,
        })
    }

    pub fn name(&self) -> &str {
        self.blob.name()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Current logical position
    pub fn file_pointer(&self) -> u64 {
        self.position
    }

    /// Move the logical position; no I/O happens until the next read
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    pub async fn length(&self) -> Result<u64> {
        self.blob.size_bytes().await
    }

    pub async fn last_modified_millis(&self) -> Result<i64> {
        self.blob.last_modified_millis().await
    }

    /// Fill `buf` completely from the current position.
    ///
    /// Issues one ranged read per chunk. A read that returns more than was
    /// asked for is a protocol violation; a read that returns nothing
    /// before `buf` is full means the blob ended early.
    pub async fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;

        while filled < buf.len() {
            let wanted = self.chunk_size.min(buf.len() - filled);
            let chunk = self.blob.read_from(self.position, wanted).await?;

            if chunk.len() > wanted {
                return Err(BlobSearchError::ProtocolViolation(format!(
                    "read of {} bytes from '{}' at {} returned {} bytes",
                    wanted,
                    self.blob.name(),
                    self.position,
                    chunk.len()
                )));
            }
            if chunk.is_empty() {
                return Err(BlobSearchError::UnexpectedEof {
                    name: self.blob.name().to_string(),
                    offset: self.position,
                });
            }

            buf[filled..filled + chunk.len()].copy_from_slice(&chunk);
            filled += chunk.len();
            self.position += chunk.len() as u64;
        }

        Ok(())
    }

    /// Read `len` bytes from the current position
    pub async fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf).await?;
        Ok(buf)
    }

    pub async fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf).await?;
        Ok(buf[0])
    }
}
