//! Storage layer: index files on a blob container and local Tantivy indexes.
//!
//! # Architecture
//!
//! - **BlobContainer**: Async blob store contract (in-memory implementation included)
//! - **BlobHandle**: One blob with its cached properties and lease token
//! - **BlobInput / BlobOutput**: Buffered, seekable index file streams
//! - **LeaseLock**: Index write lock backed by a blob lease
//! - **ObjectStoreDirectory**: Index directory over one container
//! - **TenantIndex / IndexCatalog**: Local Tantivy indexes per tenant
//!
//! # Local Index Structure
//!
//! ```text
//! {index_dir}/indexes/
//! ├── index-{tenant}/
//! │   ├── meta.json           # Index metadata
//! │   └── tantivy/            # Tantivy index
//! ```

pub mod blob;
mod catalog;
pub mod container;
mod directory;
pub mod input;
pub mod lock;
mod memory;
pub mod output;
mod tantivy;

pub use blob::BlobHandle;
pub use catalog::{IndexCatalog, IndexMetadata};
pub use container::{BlobContainer, BlobContent, BlobProperties, LeaseState, UploadCondition};
pub use directory::{DirectorySettings, ObjectStoreDirectory};
pub use input::BlobInput;
pub use lock::{LeaseLock, Lock};
pub use memory::MemoryContainer;
pub use output::BlobOutput;
pub use tantivy::{create_schema, TenantIndex, MIN_WRITER_HEAP_BYTES, SCHEMA_VERSION};
