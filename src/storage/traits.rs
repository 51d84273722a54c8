//! Storage Trait Definitions
//!
//! The ledger persists as whole snapshots: every mutation that must survive
//! a restart is followed by a `save` of the full state. Implementations can
//! use SQLite (production) or memory (testing).

use async_trait::async_trait;
use thiserror::Error;

use super::snapshot::BridgeSnapshot;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Snapshot storage interface
///
/// Implementations:
/// - `SqliteStateStore` - Production storage with SQLite
/// - `MemoryStateStore` - In-memory storage for testing
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replace the stored state with `snapshot`
    async fn save(&self, snapshot: &BridgeSnapshot) -> StorageResult<()>;

    /// Latest saved state, if any
    async fn load(&self) -> StorageResult<Option<BridgeSnapshot>>;
}
