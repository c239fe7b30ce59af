//! Shared test helpers and utilities.
//!
//! Provides factory functions for creating test doubles of forensic
//! data structures with sensible defaults.

#![allow(dead_code)]

use trace_data::store::GraphStore;
use trace_data::types::Transfer;

/// Creates an in-memory SQLite GraphStore for tests.
///
/// Uses `:memory:` database with all migrations applied.
///
/// # Panics
/// Panics if the in-memory database cannot be created (should never happen).
pub fn test_store() -> GraphStore {
    GraphStore::new(":memory:").expect("in-memory store should always open")
}

/// Creates a sample Transfer with sensible defaults.
///
/// # Arguments
/// * `hash` - Transaction hash
/// * `from` / `to` - Endpoint addresses (any casing; the intake lowercases)
/// * `value` - Base-unit value as decimal text
/// * `block` - Block number
pub fn sample_transfer(hash: &str, from: &str, to: &str, value: &str, block: u64) -> Transfer {
    Transfer {
        from: from.to_string(),
        to: to.to_string(),
        value: value.to_string(),
        hash: hash.to_string(),
        block_number: block,
        timestamp: 1_700_000_000 + block,
    }
}
