//! Dispatcher metrics for observability
//!
//! Counters for monitoring delivery health: how many records were accepted,
//! delivered, salvaged to the emergency sink, or lost.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a [`BackgroundDispatcher`](super::BackgroundDispatcher)
///
/// # Example
///
/// ```
/// use rust_log_pipeline::DispatcherMetrics;
///
/// let metrics = DispatcherMetrics::new();
///
/// metrics.record_enqueued(3);
/// metrics.record_delivered(2);
/// metrics.record_rerouted(1);
///
/// assert_eq!(metrics.pending(), 0);
/// assert_eq!(metrics.rerouted_count(), 1);
/// ```
#[derive(Debug)]
pub struct DispatcherMetrics {
    /// Records accepted into the queue
    enqueued: AtomicU64,

    /// Records the main sink accepted
    delivered: AtomicU64,

    /// Records salvaged to the emergency sink
    rerouted: AtomicU64,

    /// Records neither sink could take, or dropped on overflow
    lost: AtomicU64,

    /// Records dropped because a bounded queue was full (subset of `lost`)
    dropped: AtomicU64,

    /// Main-sink delivery calls that returned an error
    failed_batches: AtomicU64,

    /// Number of times a bounded queue was full
    queue_full_events: AtomicU64,

    /// Number of times a producer blocked waiting for queue space
    block_events: AtomicU64,
}

impl DispatcherMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            rerouted: AtomicU64::new(0),
            lost: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Acquire)
    }

    #[inline]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    #[inline]
    pub fn rerouted_count(&self) -> u64 {
        self.rerouted.load(Ordering::Acquire)
    }

    #[inline]
    pub fn lost_count(&self) -> u64 {
        self.lost.load(Ordering::Acquire)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Records accepted but not yet settled (delivered, rerouted, or lost)
    pub fn pending(&self) -> u64 {
        let settled = self.delivered_count() + self.rerouted_count() + self.lost_count();
        self.enqueued_count().saturating_sub(settled)
    }

    #[inline]
    pub fn record_enqueued(&self, n: u64) -> u64 {
        self.enqueued.fetch_add(n, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_delivered(&self, n: u64) -> u64 {
        self.delivered.fetch_add(n, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_rerouted(&self, n: u64) -> u64 {
        self.rerouted.fetch_add(n, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_lost(&self, n: u64) -> u64 {
        self.lost.fetch_add(n, Ordering::AcqRel)
    }

    /// Record an overflow drop; also counts the record as lost
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.record_lost(1);
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed_batch(&self) -> u64 {
        self.failed_batches.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of settled records that were lost, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has settled yet.
    pub fn loss_rate(&self) -> f64 {
        let lost = self.lost_count() as f64;
        let total = self.delivered_count() as f64 + self.rerouted_count() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }
}

impl Default for DispatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DispatcherMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued_count()),
            delivered: AtomicU64::new(self.delivered_count()),
            rerouted: AtomicU64::new(self.rerouted_count()),
            lost: AtomicU64::new(self.lost_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            failed_batches: AtomicU64::new(self.failed_batches()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}
