//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for one
//! subcommand.

pub mod completions;
pub mod config;
pub mod count;
pub mod index;
pub mod indexes;
pub mod related;
pub mod remove;
pub mod search;

// Re-export argument types for use in mod.rs
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use count::CountArgs;
pub use index::IndexArgs;
pub use indexes::ListIndexesArgs;
pub use related::RelatedArgs;
pub use remove::RemoveArgs;
pub use search::SearchArgs;
