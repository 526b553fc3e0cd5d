//! Utilities for testing code that talks to a database.

mod memory_agent;
mod truncate;

pub use memory_agent::MemoryAgent;
pub use truncate::{RESERVED_TABLE_NAMES, Truncator};

use tracing_subscriber::EnvFilter;

/// Initializes tracing output for tests.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
