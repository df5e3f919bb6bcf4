//! [`Sequencer`]: the contract between the front-end and a storage engine.

use bytes::Bytes;

use crate::error::EngineError;

/// Assigns durable indices to log entries.
///
/// - Any payload is accepted; this layer does no validation.
/// - `Ok(index)` means the entry is durably stored at `index`, and no other
///   entry will ever get that index. The entry must show up in a published
///   checkpoint in a timely fashion, but the call does not wait for that.
/// - `Err(_)` means the entry was not committed. Nothing is retried here.
/// - Safe to call concurrently. Indices of concurrently submitted entries are
///   unique but otherwise unordered.
#[async_trait::async_trait]
pub trait Sequencer: Send + Sync {
    /// Sequence `entry`, returning its index once durable.
    async fn sequence(&self, entry: Bytes) -> Result<u64, EngineError>;
}
