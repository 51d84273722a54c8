//! Storage Layer Module
//!
//! Provides snapshot persistence for the bridge ledger.
//!
//! This module contains:
//! - The snapshot type and storage trait
//! - SQLite implementation for production
//! - In-memory implementation for testing

pub mod memory;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience
pub use memory::MemoryStateStore;
pub use snapshot::{BridgeSnapshot, SNAPSHOT_VERSION};
pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};
