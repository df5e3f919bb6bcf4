//! Sequencing for Quire.
//!
//! The HTTP front-end depends only on the [`Sequencer`] trait: hand over an
//! entry, get back its durable index. Any storage engine implementing it must
//! also integrate sequenced entries into the authenticated tree in a timely
//! fashion, publishing new checkpoints through a
//! [`TreeState`](quire_store::TreeState).
//!
//! [`LogEngine`] is the reference engine: it batches entries, writes them to
//! an [`EntryStore`], and republishes an RFC 6962 root after every batch.

pub mod engine;
pub mod entries;
pub mod error;
pub mod merkle;
pub mod sequencer;

pub use engine::{EngineConfig, LogEngine};
pub use entries::{EntryStore, FileEntryStore, MemoryEntryStore};
pub use error::EngineError;
pub use sequencer::Sequencer;
