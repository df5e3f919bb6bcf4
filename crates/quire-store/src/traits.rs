//! Core traits for checkpoint persistence and tree state.

use bytes::Bytes;

use crate::error::{CheckpointError, StoreError};

/// A verified `(size, hash)` pair read from the latest checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHead {
    /// Number of entries covered by the checkpoint.
    pub size: u64,
    /// Root hash over the first `size` entries.
    pub hash: Vec<u8>,
}

/// Raw persistence for the signed checkpoint.
///
/// Implementations must replace the checkpoint atomically: a concurrent
/// reader sees either the old bytes or the new bytes, never a mix.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the stored checkpoint. Returns `None` if none has been written.
    async fn read_checkpoint(&self) -> Result<Option<Bytes>, StoreError>;

    /// Replace the stored checkpoint.
    async fn write_checkpoint(&self, data: Bytes) -> Result<(), StoreError>;
}

/// Read and publish access to the authenticated tree.
///
/// This is the capability a storage engine is constructed with: it reads the
/// verified baseline at startup and publishes a new checkpoint whenever it
/// has durably integrated more entries.
#[async_trait::async_trait]
pub trait TreeState: Send + Sync {
    /// Read and verify the currently published checkpoint.
    ///
    /// Returns [`CheckpointError::Missing`] if the log has no checkpoint yet.
    async fn current_tree(&self) -> Result<TreeHead, CheckpointError>;

    /// Sign and publish a checkpoint for `(size, hash)`, replacing the
    /// previous one.
    ///
    /// The caller asserts that the first `size` entries are durable and that
    /// `hash` is their root.
    async fn publish_tree(&self, size: u64, hash: &[u8]) -> Result<(), CheckpointError>;
}
