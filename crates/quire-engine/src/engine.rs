//! [`LogEngine`]: a batching sequencer over an [`EntryStore`].
//!
//! A single background task owns the next index and the compact Merkle range.
//! Callers submit entries over a channel and wait on a oneshot reply. The task
//! groups entries into batches, writes them durably, answers the callers, then
//! integrates the batch and publishes a new checkpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use quire_store::{CheckpointError, StoreError, TreeState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::entries::EntryStore;
use crate::error::EngineError;
use crate::merkle::{MerkleRange, leaf_hash};
use crate::sequencer::Sequencer;

/// How often a failed checkpoint publication is retried while idle.
const PUBLISH_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Attempts at discarding each entry of a failed batch.
const DISCARD_ATTEMPTS: u32 = 3;
const DISCARD_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Batching configuration for the [`LogEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Flush a batch once it holds this many entries.
    pub batch_size: usize,
    /// Flush a batch once its oldest entry has waited this long.
    pub batch_max_age: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            batch_max_age: Duration::from_millis(100),
        }
    }
}

/// An entry waiting for its index.
struct Pending {
    entry: Bytes,
    reply: oneshot::Sender<Result<u64, EngineError>>,
}

/// Reference storage engine.
///
/// Entries are stored through an [`EntryStore`] and integrated into an
/// RFC 6962 tree whose root is published through a [`TreeState`] after
/// every batch.
pub struct LogEngine {
    tx: mpsc::Sender<Pending>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LogEngine {
    /// Open the engine over existing storage and start the sequencing task.
    ///
    /// The tree state must already hold a checkpoint (see
    /// `SignedTreeState::initialize`). Every entry it covers is re-read and
    /// re-hashed, and the result must match the checkpoint root. Entries
    /// durably written past the checkpoint size by a previous run are
    /// integrated and published before the engine accepts new work.
    pub async fn open(
        entries: Arc<dyn EntryStore>,
        tree: Arc<dyn TreeState>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let head = tree.current_tree().await?;

        let mut range = MerkleRange::new();
        for index in 0..head.size {
            let entry = entries
                .read_entry(index)
                .await?
                .ok_or(EngineError::MissingEntry {
                    index,
                    size: head.size,
                })?;
            range.append(leaf_hash(&entry));
        }

        let computed = range.root();
        if computed[..] != head.hash[..] {
            return Err(EngineError::RootMismatch {
                size: head.size,
                checkpoint: hex::encode(&head.hash),
                computed: hex::encode(computed),
            });
        }

        let mut integrator = Integrator {
            entries,
            tree,
            range,
            published: head.size,
        };

        let recovered = integrator.recover().await?;
        if recovered > 0 {
            info!(
                recovered,
                size = integrator.range.size(),
                "integrating entries sequenced before restart"
            );
            integrator.try_publish().await?;
        }

        let batch_size = config.batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size.max(64));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            size = integrator.range.size(),
            batch_size,
            batch_max_age = ?config.batch_max_age,
            "log engine started"
        );

        let worker = Worker {
            integrator,
            batch_size,
            batch_max_age: config.batch_max_age,
        };
        let task = tokio::spawn(worker.run(rx, shutdown_rx));

        Ok(Self {
            tx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    /// Stop accepting entries, flush anything pending and wait for the
    /// sequencing task to exit.
    ///
    /// Calls to [`Sequencer::sequence`] after this fail with
    /// [`EngineError::Closed`]. The engine also stops on its own if a failed
    /// batch cannot be rolled back.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().expect("lock poisoned").take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(error = %e, "sequencing task failed");
        }
    }
}

#[async_trait::async_trait]
impl Sequencer for LogEngine {
    async fn sequence(&self, entry: Bytes) -> Result<u64, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Pending { entry, reply })
            .await
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }
}

/// Durable state owned by the sequencing task.
struct Integrator {
    entries: Arc<dyn EntryStore>,
    tree: Arc<dyn TreeState>,
    range: MerkleRange,
    /// Size of the last checkpoint known to be published.
    published: u64,
}

impl Integrator {
    /// Fold in entries stored past the current range. Returns how many.
    async fn recover(&mut self) -> Result<u64, EngineError> {
        let mut recovered = 0;
        while let Some(entry) = self.entries.read_entry(self.range.size()).await? {
            self.range.append(leaf_hash(&entry));
            recovered += 1;
        }
        Ok(recovered)
    }

    /// Store a batch, answer its callers and integrate it.
    ///
    /// Fails only when a failed batch could not be rolled back. The engine
    /// must not sequence anything after that.
    async fn commit(&mut self, batch: Vec<Pending>) -> Result<(), StoreError> {
        let first = self.range.size();

        let mut failure = None;
        for (i, pending) in batch.iter().enumerate() {
            let index = first + i as u64;
            if let Err(e) = self.entries.write_entry(index, pending.entry.clone()).await {
                failure = Some((index, e));
                break;
            }
        }

        if let Some((failed_at, e)) = failure {
            warn!(first, failed_at, error = %e, "batch write failed");
            let reason = e.to_string();
            // Callers may only hear "not committed" once nothing of the batch
            // is left for a later recovery to find.
            if let Err(discard) = self.roll_back(first, failed_at).await {
                error!(
                    first,
                    failed_at,
                    error = %discard,
                    "failed to roll back batch, entries may reappear on restart"
                );
                for pending in batch {
                    let _ = pending.reply.send(Err(EngineError::Indeterminate {
                        reason: reason.clone(),
                    }));
                }
                return Err(discard);
            }
            for pending in batch {
                let _ = pending.reply.send(Err(EngineError::BatchFailed {
                    reason: reason.clone(),
                }));
            }
            return Ok(());
        }

        let count = batch.len();
        for (i, pending) in batch.into_iter().enumerate() {
            self.range.append(leaf_hash(&pending.entry));
            // The caller may have gone away; the entry is committed regardless.
            let _ = pending.reply.send(Ok(first + i as u64));
        }
        debug!(first, count, "sequenced batch");

        self.publish().await;
        Ok(())
    }

    /// Discard entries `first..=last`, lowest first, retrying each a few
    /// times.
    async fn roll_back(&self, first: u64, last: u64) -> Result<(), StoreError> {
        for index in first..=last {
            let mut attempt = 1;
            loop {
                match self.entries.discard_entry(index).await {
                    Ok(()) => break,
                    Err(e) if attempt < DISCARD_ATTEMPTS => {
                        warn!(index, attempt, error = %e, "failed to discard entry, retrying");
                        attempt += 1;
                        tokio::time::sleep(DISCARD_RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Publish the current root, propagating failure.
    async fn try_publish(&mut self) -> Result<(), CheckpointError> {
        let size = self.range.size();
        self.tree.publish_tree(size, &self.range.root()).await?;
        self.published = size;
        Ok(())
    }

    /// Publish the current root, logging failure for a later retry.
    async fn publish(&mut self) {
        if let Err(e) = self.try_publish().await {
            warn!(
                size = self.range.size(),
                error = %e,
                "failed to publish checkpoint, will retry"
            );
        }
    }

    fn needs_publish(&self) -> bool {
        self.published < self.range.size()
    }
}

struct Worker {
    integrator: Integrator,
    batch_size: usize,
    batch_max_age: Duration,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Pending>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut batch: Vec<Pending> = Vec::with_capacity(self.batch_size);
        let mut deadline: Option<Instant> = None;
        let mut retry = tokio::time::interval(PUBLISH_RETRY_INTERVAL);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut failed = false;
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(pending) = msg else {
                        debug!("all senders dropped");
                        break;
                    };
                    if batch.is_empty() {
                        deadline = Some(Instant::now() + self.batch_max_age);
                    }
                    batch.push(pending);
                    if batch.len() >= self.batch_size {
                        deadline = None;
                        if self.integrator.commit(std::mem::take(&mut batch)).await.is_err() {
                            failed = true;
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if self.integrator.commit(std::mem::take(&mut batch)).await.is_err() {
                        failed = true;
                        break;
                    }
                }
                _ = retry.tick(), if self.integrator.needs_publish() => {
                    self.integrator.publish().await;
                }
                _ = shutdown_rx.changed() => {
                    info!("log engine shutting down");
                    rx.close();
                    while let Some(pending) = rx.recv().await {
                        batch.push(pending);
                    }
                    break;
                }
            }
        }

        if failed {
            error!("log engine stopped after a failed rollback");
            rx.close();
            while let Some(pending) = rx.recv().await {
                batch.push(pending);
            }
            for pending in batch {
                let _ = pending.reply.send(Err(EngineError::Closed));
            }
        } else if !batch.is_empty() {
            let _ = self.integrator.commit(batch).await;
        }
        if self.integrator.needs_publish() {
            self.integrator.publish().await;
        }
        info!(size = self.integrator.range.size(), "log engine stopped");
    }
}
