//! In-memory checkpoint store.

use std::sync::RwLock;

use bytes::Bytes;

use crate::error::StoreError;
use crate::traits::CheckpointStore;

/// Checkpoint store holding the latest checkpoint in memory.
///
/// Used by tests and embedders that do not need persistence.
#[derive(Default)]
pub struct MemoryStore {
    checkpoint: RwLock<Option<Bytes>>,
}

impl MemoryStore {
    /// Create an empty store (no checkpoint yet).
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryStore {
    async fn read_checkpoint(&self) -> Result<Option<Bytes>, StoreError> {
        let checkpoint = self.checkpoint.read().expect("lock poisoned");
        Ok(checkpoint.clone())
    }

    async fn write_checkpoint(&self, data: Bytes) -> Result<(), StoreError> {
        let mut checkpoint = self.checkpoint.write().expect("lock poisoned");
        *checkpoint = Some(data);
        Ok(())
    }
}
