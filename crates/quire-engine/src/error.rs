//! Error types for the engine.

/// Errors that can occur while sequencing or integrating entries.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to access the entry store.
    #[error("store error: {0}")]
    Store(#[from] quire_store::StoreError),

    /// Failed to read or publish a checkpoint.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] quire_store::CheckpointError),

    /// The batch containing the entry could not be made durable.
    #[error("batch write failed: {reason}")]
    BatchFailed {
        /// Underlying failure.
        reason: String,
    },

    /// A batch failed and could not be rolled back. Its entries may still be
    /// integrated when the log is next opened.
    #[error("batch outcome unknown: {reason}")]
    Indeterminate {
        /// Underlying failure.
        reason: String,
    },

    /// An entry covered by the checkpoint is not in the entry store.
    #[error("entry {index} missing below checkpoint size {size}")]
    MissingEntry {
        /// Index of the missing entry.
        index: u64,
        /// Size of the checkpoint.
        size: u64,
    },

    /// The stored entries do not hash to the checkpoint root.
    #[error("root mismatch at size {size}: checkpoint {checkpoint}, computed {computed}")]
    RootMismatch {
        /// Size of the checkpoint.
        size: u64,
        /// Root hash in the checkpoint (hex).
        checkpoint: String,
        /// Root hash recomputed from stored entries (hex).
        computed: String,
    },

    /// The engine has shut down.
    #[error("sequencer is shut down")]
    Closed,
}
