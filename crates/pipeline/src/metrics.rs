//! Stage metrics
//!
//! Atomic counters for the stage driver. Routing outcomes (deliveries,
//! evaluation failures) live in `sluice_routing::RouterMetrics`; these count
//! what the stage itself sees.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a routing stage
///
/// All counters use relaxed ordering. Safe to update from every worker.
#[derive(Debug, Default)]
pub struct StageMetrics {
    /// Batches taken from the input channel
    batches_received: AtomicU64,

    /// Records in those batches
    records_received: AtomicU64,

    /// Batches whose delivery failed
    batches_failed: AtomicU64,

    /// Events tagged by the no-route handler
    unrouted_events: AtomicU64,
}

impl StageMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            records_received: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            unrouted_events: AtomicU64::new(0),
        }
    }

    /// Record a batch entering the stage
    #[inline]
    pub fn record_batch(&self, record_count: u64) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.records_received
            .fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record a batch whose delivery failed
    #[inline]
    pub fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event handed to the no-route handler
    #[inline]
    pub fn record_unrouted(&self) {
        self.unrouted_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    #[inline]
    pub fn snapshot(&self) -> StageMetricsSnapshot {
        StageMetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            unrouted_events: self.unrouted_events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of stage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageMetricsSnapshot {
    /// Batches taken from the input channel
    pub batches_received: u64,
    /// Records in those batches
    pub records_received: u64,
    /// Batches whose delivery failed
    pub batches_failed: u64,
    /// Events tagged by the no-route handler
    pub unrouted_events: u64,
}
