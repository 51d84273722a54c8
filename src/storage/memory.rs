//! In-Memory Storage Implementation
//!
//! Keeps the latest snapshot in memory for testing and development.
//! Data is lost when the process exits.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::snapshot::BridgeSnapshot;
use super::traits::{StateStore, StorageResult};

/// In-memory snapshot store
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    latest: Arc<RwLock<Option<BridgeSnapshot>>>,
    saves: Arc<RwLock<u64>>,
}

impl MemoryStateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots written so far
    pub async fn save_count(&self) -> u64 {
        *self.saves.read().await
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, snapshot: &BridgeSnapshot) -> StorageResult<()> {
        snapshot.check_version()?;
        *self.latest.write().await = Some(snapshot.clone());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn load(&self) -> StorageResult<Option<BridgeSnapshot>> {
        Ok(self.latest.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::snapshot::fixtures;
    use crate::storage::StorageError;

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStateStore::new();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let store = MemoryStateStore::new();
        let mut snapshot = fixtures::snapshot();
        store.save(&snapshot).await.unwrap();

        snapshot.taken_at += 1;
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(snapshot));
        assert_eq!(store.save_count().await, 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStateStore::new();
        let other = store.clone();
        store.save(&fixtures::snapshot()).await.unwrap();
        assert!(other.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejects_foreign_version() {
        let store = MemoryStateStore::new();
        let mut snapshot = fixtures::snapshot();
        snapshot.version = 99;
        assert!(matches!(
            store.save(&snapshot).await,
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
