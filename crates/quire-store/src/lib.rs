//! Checkpoint storage and the authenticated tree state.
//!
//! This crate owns everything between a raw checkpoint file and a verified
//! `(size, hash)` pair:
//!
//! - [`Checkpoint`]: the checkpoint body and its signed-note codec
//!   ([`sign_checkpoint`], [`parse_and_verify`]).
//! - [`CheckpointStore`]: raw persistence of the signed checkpoint bytes,
//!   with [`FileStore`] and [`MemoryStore`] backends.
//! - [`TreeState`]: the read/publish capability handed to storage engines,
//!   implemented by [`SignedTreeState`].

mod checkpoint;
mod error;
mod file_store;
mod memory_store;
mod traits;
mod tree_state;


pub use checkpoint::{Checkpoint, parse_and_verify, sign_checkpoint};
pub use error::{CheckpointError, StoreError};
pub use file_store::{CHECKPOINT_FILE, FileStore, sync_dir};
pub use memory_store::MemoryStore;
pub use traits::{CheckpointStore, TreeHead, TreeState};
pub use tree_state::SignedTreeState;
