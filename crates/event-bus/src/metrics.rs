//! Metrics hooks for bus operations
//!
//! [`BusMetrics`] is the in-process collector the coordinator uses by
//! default. External systems (Prometheus, StatsD) plug in by implementing
//! [`MetricsRecorder`].
//!
//! ## Usage
//!
//! ```ignore
//! use event_bus::metrics::{BusMetrics, MetricsRecorder};
//!
//! let metrics = BusMetrics::new();
//! metrics.record_emit("OrderCreated");
//! assert_eq!(metrics.snapshot().events_emitted, 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Why an event did not reach any subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Payload failed validation.
    Invalid,
    /// No channel exists for the event name.
    NoSubscribers,
    /// The queue refused the event.
    EnqueueFailed,
    /// Suppressed by a throttle window.
    Throttled,
}

impl DropReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NoSubscribers => "no_subscribers",
            Self::EnqueueFailed => "enqueue_failed",
            Self::Throttled => "throttled",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for custom metrics recording implementations
pub trait MetricsRecorder: Send + Sync {
    /// An event was accepted by `emit`.
    fn record_emit(&self, event_name: &str);

    /// An event was queued; `depth` is the queue length afterwards.
    fn record_enqueue(&self, depth: usize);

    /// An event was pushed to `subscribers` live subscriptions.
    fn record_delivery(&self, event_name: &str, subscribers: usize);

    /// An event was dropped.
    fn record_drop(&self, event_name: &str, reason: DropReason);

    /// One batch of a drain was delivered.
    fn record_batch(&self, size: usize, duration: Duration);
}

/// Metrics collector for bus operations
#[derive(Default)]
pub struct BusMetrics {
    /// Events accepted by `emit`
    pub events_emitted: AtomicU64,
    /// Events pushed onto a queue
    pub events_enqueued: AtomicU64,
    /// Deliveries to individual subscriptions
    pub deliveries: AtomicU64,
    /// Events rejected by validation
    pub dropped_invalid: AtomicU64,
    /// Events delivered to a name with no channel
    pub dropped_no_subscribers: AtomicU64,
    /// Events refused by the queue
    pub dropped_enqueue: AtomicU64,
    /// Events suppressed by throttling
    pub dropped_throttled: AtomicU64,
    /// Batches delivered by drains
    pub batches_drained: AtomicU64,
    /// Cumulative batch delivery time in nanoseconds
    pub batch_time_ns: AtomicU64,
    /// Largest queue depth observed
    pub max_queue_depth: AtomicU64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total events dropped for any reason.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_invalid.load(Ordering::Relaxed)
            + self.dropped_no_subscribers.load(Ordering::Relaxed)
            + self.dropped_enqueue.load(Ordering::Relaxed)
            + self.dropped_throttled.load(Ordering::Relaxed)
    }

    /// Average batch delivery time in nanoseconds
    pub fn avg_batch_time_ns(&self) -> u64 {
        let total = self.batch_time_ns.load(Ordering::Relaxed);
        let count = self.batches_drained.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            dropped_no_subscribers: self.dropped_no_subscribers.load(Ordering::Relaxed),
            dropped_enqueue: self.dropped_enqueue.load(Ordering::Relaxed),
            dropped_throttled: self.dropped_throttled.load(Ordering::Relaxed),
            batches_drained: self.batches_drained.load(Ordering::Relaxed),
            avg_batch_ns: self.avg_batch_time_ns(),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.events_emitted,
            &self.events_enqueued,
            &self.deliveries,
            &self.dropped_invalid,
            &self.dropped_no_subscribers,
            &self.dropped_enqueue,
            &self.dropped_throttled,
            &self.batches_drained,
            &self.batch_time_ns,
            &self.max_queue_depth,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_emitted: u64,
    pub events_enqueued: u64,
    pub deliveries: u64,
    pub dropped_invalid: u64,
    pub dropped_no_subscribers: u64,
    pub dropped_enqueue: u64,
    pub dropped_throttled: u64,
    pub batches_drained: u64,
    pub avg_batch_ns: u64,
    pub max_queue_depth: u64,
}

impl MetricsRecorder for BusMetrics {
    fn record_emit(&self, _event_name: &str) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_enqueue(&self, depth: usize) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
        self.max_queue_depth
            .fetch_max(depth as u64, Ordering::Relaxed);
    }

    fn record_delivery(&self, _event_name: &str, subscribers: usize) {
        self.deliveries
            .fetch_add(subscribers as u64, Ordering::Relaxed);
    }

    fn record_drop(&self, _event_name: &str, reason: DropReason) {
        let counter = match reason {
            DropReason::Invalid => &self.dropped_invalid,
            DropReason::NoSubscribers => &self.dropped_no_subscribers,
            DropReason::EnqueueFailed => &self.dropped_enqueue,
            DropReason::Throttled => &self.dropped_throttled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_batch(&self, _size: usize, duration: Duration) {
        self.batches_drained.fetch_add(1, Ordering::Relaxed);
        self.batch_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_emit(&self, _: &str) {}
    fn record_enqueue(&self, _: usize) {}
    fn record_delivery(&self, _: &str, _: usize) {}
    fn record_drop(&self, _: &str, _: DropReason) {}
    fn record_batch(&self, _: usize, _: Duration) {}
}
