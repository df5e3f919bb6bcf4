//! [`SignedTreeState`]: tree state backed by signed checkpoints.

use bytes::Bytes;
use quire_note::{NoteSigner, NoteVerifier};
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, parse_and_verify, sign_checkpoint};
use crate::error::CheckpointError;
use crate::traits::{CheckpointStore, TreeHead, TreeState};

/// Reads and publishes signed checkpoints through a [`CheckpointStore`].
///
/// Holds the log's signer and verifier, which must be the two halves of the
/// same key. The signer's name is the origin of every published checkpoint.
pub struct SignedTreeState<S> {
    store: S,
    signer: NoteSigner,
    verifier: NoteVerifier,
}

impl<S: CheckpointStore> SignedTreeState<S> {
    /// Create a tree state over `store`.
    ///
    /// Fails with [`CheckpointError::KeyMismatch`] if checkpoints signed by
    /// `signer` could never verify under `verifier`.
    pub fn new(
        store: S,
        signer: NoteSigner,
        verifier: NoteVerifier,
    ) -> Result<Self, CheckpointError> {
        if signer.name() != verifier.name() || signer.key_hash() != verifier.key_hash() {
            return Err(CheckpointError::KeyMismatch {
                signer: format!("{}+{:08x}", signer.name(), signer.key_hash()),
                verifier: format!("{}+{:08x}", verifier.name(), verifier.key_hash()),
            });
        }
        Ok(Self {
            store,
            signer,
            verifier,
        })
    }

    /// The log origin.
    pub fn origin(&self) -> &str {
        self.signer.name()
    }

    /// The log verifier.
    pub fn verifier(&self) -> &NoteVerifier {
        &self.verifier
    }

    /// The underlying checkpoint store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Establish the starting tree state.
    ///
    /// - Existing valid checkpoint: returned as-is.
    /// - No checkpoint: an empty tree `(0, empty_hash)` is published and
    ///   returned.
    /// - Invalid checkpoint: the error is returned and nothing is written.
    pub async fn initialize(&self, empty_hash: &[u8]) -> Result<TreeHead, CheckpointError> {
        match self.current_tree().await {
            Ok(head) => {
                info!(size = head.size, origin = self.origin(), "found existing checkpoint");
                Ok(head)
            }
            Err(CheckpointError::Missing) => {
                info!(origin = self.origin(), "no checkpoint found, initializing empty log");
                self.publish_tree(0, empty_hash).await?;
                Ok(TreeHead {
                    size: 0,
                    hash: empty_hash.to_vec(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl<S: CheckpointStore> TreeState for SignedTreeState<S> {
    async fn current_tree(&self) -> Result<TreeHead, CheckpointError> {
        let Some(bytes) = self.store.read_checkpoint().await? else {
            return Err(CheckpointError::Missing);
        };
        let checkpoint = parse_and_verify(&bytes, &self.verifier)?;
        Ok(TreeHead {
            size: checkpoint.size,
            hash: checkpoint.hash,
        })
    }

    async fn publish_tree(&self, size: u64, hash: &[u8]) -> Result<(), CheckpointError> {
        let checkpoint = Checkpoint::new(self.origin(), size, hash);
        let signed = sign_checkpoint(&checkpoint, &self.signer)?;
        self.store.write_checkpoint(Bytes::from(signed)).await?;
        debug!(size, "published checkpoint");
        Ok(())
    }
}
