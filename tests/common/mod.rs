// Common test utilities and fixtures

pub mod fixtures;
pub mod helpers;

// Each test binary uses a different subset
#[allow(unused_imports)]
pub use fixtures::{entry, entry_with};
#[allow(unused_imports)]
pub use helpers::{create_local_services, memory_engine, CountingContainer, HEAP};
