//! Shared Test Helpers for Cross-Crate Use
//!
//! Centralized test utilities used by the workspace test suites to avoid
//! code duplication.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Global counter for truly unique test identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate globally unique test identifiers that won't conflict across
/// parallel tests.
///
/// Combines a millisecond timestamp with an atomic counter so identifiers
/// stay unique even when tests run in parallel across threads and crates.
pub fn generate_unique_id(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, timestamp, counter)
}

/// Build a throwaway SQLite database URL under the system temp directory.
///
/// Each call returns a distinct file so parallel tests never share state.
/// `mode=rwc` lets SQLite create the file on first connect.
pub fn temp_database_url(prefix: &str) -> String {
    let path = std::env::temp_dir().join(format!("{}.db", generate_unique_id(prefix)));
    format!("sqlite://{}?mode=rwc", path.display())
}
