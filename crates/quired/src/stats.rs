//! Periodic log growth and latency reporting.

use std::sync::Arc;
use std::time::Duration;

use quire_http::Latency;
use quire_store::TreeState;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Compares successive checkpoints and logs how much the log grew.
pub struct StatsReporter {
    tree: Arc<dyn TreeState>,
    latency: Arc<Latency>,
    last_size: Option<u64>,
}

impl StatsReporter {
    pub fn new(tree: Arc<dyn TreeState>, latency: Arc<Latency>) -> Self {
        Self {
            tree,
            latency,
            last_size: None,
        }
    }

    /// Read the current checkpoint and log its growth since the previous
    /// successful read.
    ///
    /// Returns the growth, or `None` on the first read and on read errors.
    pub async fn observe(&mut self) -> Option<u64> {
        let head = match self.tree.current_tree().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "failed to read checkpoint");
                return None;
            }
        };

        let added = self
            .last_size
            .map(|last| head.size.saturating_sub(last));
        if let Some(added) = added {
            info!(
                size = head.size,
                added,
                latency = %self.latency,
                "checkpoint size"
            );
        }
        self.last_size = Some(head.size);
        added
    }
}

/// Run a [`StatsReporter`] every `interval` until `shutdown_rx` fires.
pub async fn run_stats(
    tree: Arc<dyn TreeState>,
    latency: Arc<Latency>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut reporter = StatsReporter::new(tree, latency);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                reporter.observe().await;
            }
            _ = shutdown_rx.changed() => {
                info!("stats reporter shutting down");
                break;
            }
        }
    }
}
