//! Error types for checkpoint storage and verification.

use quire_note::NoteError;

/// Errors from a raw checkpoint store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reading, verifying, signing or publishing a checkpoint.
///
/// [`Missing`](Self::Missing) means the log has never been initialized.
/// [`Invalid`](Self::Invalid) means a checkpoint exists but cannot be trusted.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// No checkpoint has been written yet (fresh log).
    #[error("no checkpoint found")]
    Missing,

    /// Checkpoint bytes exist but fail parsing or signature verification.
    #[error("invalid checkpoint: {reason}")]
    Invalid {
        /// What failed.
        reason: String,
    },

    /// Signing a new checkpoint failed.
    #[error("failed to sign checkpoint: {reason}")]
    Sign {
        /// What failed.
        reason: String,
    },

    /// The configured signer and verifier are not the same key.
    #[error("signer {signer} does not match verifier {verifier}")]
    KeyMismatch {
        /// Signer name and hash.
        signer: String,
        /// Verifier name and hash.
        verifier: String,
    },

    /// The underlying store failed.
    #[error("checkpoint store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckpointError {
    /// Create an invalid checkpoint error with a custom reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Whether this is the fresh-log condition.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<NoteError> for CheckpointError {
    fn from(e: NoteError) -> Self {
        Self::invalid(format!("failed to verify signatures on checkpoint: {e}"))
    }
}
