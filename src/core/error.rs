//! Error types and error handling for blobsearch.
//!
//! One error enum covers the storage layer (blob container, streams,
//! locks) and the search layer (index factory, clients, remote
//! services). Lease acquisition has its own typed outcome so callers can
//! tell contention apart from transport failures.

use thiserror::Error;

/// Result type alias for blobsearch operations
pub type Result<T> = std::result::Result<T, BlobSearchError>;

/// Main error type for blobsearch
#[derive(Error, Debug)]
pub enum BlobSearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: &'static str, message: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Conflict on '{name}': {message}")]
    Conflict { name: String, message: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unexpected end of blob '{name}' at offset {offset}")]
    UnexpectedEof { name: String, offset: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BlobSearchError {
    /// Shorthand for an argument precondition failure
    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        BlobSearchError::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BlobSearchError::NotFound(_) | BlobSearchError::IndexNotFound(_)
        )
    }

    /// Check if this is a conflict error (lease held, precondition failed)
    pub fn is_conflict(&self) -> bool {
        matches!(self, BlobSearchError::Conflict { .. })
    }

    /// Check if this error signals programmer error rather than a runtime
    /// condition
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BlobSearchError::InvalidArgument { .. }
                | BlobSearchError::ProtocolViolation(_)
                | BlobSearchError::Config(_)
        )
    }

    /// Check if the operation is not implemented by this provider
    pub fn is_not_supported(&self) -> bool {
        matches!(self, BlobSearchError::NotSupported(_))
    }
}

impl From<tantivy::TantivyError> for BlobSearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        BlobSearchError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for BlobSearchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => BlobSearchError::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => BlobSearchError::Transport(err.to_string()),
        }
    }
}

/// Outcome of a failed lease acquisition or release
#[derive(Error, Debug)]
pub enum LeaseError {
    /// Another holder owns an active lease. Expected under contention.
    #[error("blob '{name}' is already leased")]
    Contended { name: String },

    /// The store answered but did not grant (or accept) the token
    #[error("lease request on '{name}' was rejected: {message}")]
    Rejected { name: String, message: String },

    /// The request never produced an answer from the store
    #[error("lease request failed: {0}")]
    Transport(#[from] BlobSearchError),
}

impl LeaseError {
    /// Whether a later retry by the caller could succeed
    pub fn is_contention(&self) -> bool {
        matches!(self, LeaseError::Contended { .. })
    }
}
