//! Request latency aggregation.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Running count, mean, minimum and maximum of request latencies.
///
/// Shared between all request handlers and the stats reporter.
#[derive(Debug, Default)]
pub struct Latency {
    inner: Mutex<LatencyInner>,
}

#[derive(Debug, Default)]
struct LatencyInner {
    count: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
}

/// Point-in-time copy of the aggregated latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySnapshot {
    /// Number of samples.
    pub count: u64,
    /// Mean sample, zero without samples.
    pub mean: Duration,
    /// Smallest sample, `None` without samples.
    pub min: Option<Duration>,
    /// Largest sample, zero without samples.
    pub max: Duration,
}

impl Latency {
    /// An empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one sample.
    pub fn add(&self, sample: Duration) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.count += 1;
        inner.total += sample;
        inner.min = Some(inner.min.map_or(sample, |min| min.min(sample)));
        inner.max = inner.max.max(sample);
    }

    /// Start timing a request. The elapsed time is added when the returned
    /// guard is dropped, whatever path the request takes.
    pub fn start(&self) -> LatencyTimer<'_> {
        LatencyTimer {
            latency: self,
            started: Instant::now(),
        }
    }

    /// Current aggregate.
    pub fn snapshot(&self) -> LatencySnapshot {
        let inner = self.inner.lock().expect("lock poisoned");
        let mean = if inner.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((inner.total.as_nanos() / u128::from(inner.count)) as u64)
        };
        LatencySnapshot {
            count: inner.count,
            mean,
            min: inner.min,
            max: inner.max,
        }
    }

    /// Human-readable summary: `--` before the first sample, otherwise
    /// `[Mean: .. Min: .. Max: ..]`.
    pub fn report(&self) -> String {
        self.snapshot().to_string()
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

impl fmt::Display for LatencySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.min {
            None => f.write_str("--"),
            Some(min) => write!(
                f,
                "[Mean: {:?} Min: {:?} Max: {:?}]",
                self.mean, min, self.max
            ),
        }
    }
}

/// Adds its elapsed time to a [`Latency`] on drop.
pub struct LatencyTimer<'a> {
    latency: &'a Latency,
    started: Instant,
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        self.latency.add(self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let latency = Latency::new();
        assert_eq!(latency.report(), "--");
        assert_eq!(latency.snapshot(), LatencySnapshot::default());
    }

    #[test]
    fn test_mean_min_max() {
        let latency = Latency::new();
        latency.add(Duration::from_millis(100));
        latency.add(Duration::from_millis(300));

        let snap = latency.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.mean, Duration::from_millis(200));
        assert_eq!(snap.min, Some(Duration::from_millis(100)));
        assert_eq!(snap.max, Duration::from_millis(300));
        assert_eq!(latency.report(), "[Mean: 200ms Min: 100ms Max: 300ms]");
        assert_eq!(latency.to_string(), latency.report());
    }

    #[test]
    fn test_min_tracks_first_sample() {
        // The minimum must come from real samples, not a zero default.
        let latency = Latency::new();
        latency.add(Duration::from_millis(50));
        assert_eq!(latency.snapshot().min, Some(Duration::from_millis(50)));
        latency.add(Duration::from_millis(70));
        assert_eq!(latency.snapshot().min, Some(Duration::from_millis(50)));
        latency.add(Duration::from_millis(10));
        assert_eq!(latency.snapshot().min, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_timer_records_on_drop() {
        let latency = Latency::new();
        {
            let _timer = latency.start();
        }
        assert_eq!(latency.snapshot().count, 1);
    }
}
