//! Router metrics
//!
//! Atomic counters for tracking routing outcomes.
//! All operations use relaxed ordering for maximum performance.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::evaluator::EvaluationFailure;

/// Metrics for the router
///
/// All counters use relaxed ordering. Values are eventually consistent, not
/// real-time.
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently, which
/// is how the router is used when several workers share it.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Batches passed to `route`
    batches_routed: AtomicU64,

    /// Records received across all batches
    records_received: AtomicU64,

    /// Consumer calls that succeeded
    component_deliveries: AtomicU64,

    /// Records handed to consumers (counted once per component)
    records_delivered: AtomicU64,

    /// Components skipped because nothing was selected
    empty_deliveries_skipped: AtomicU64,

    /// Consumer calls that failed
    delivery_failures: AtomicU64,

    /// Route predicates that failed on an event
    evaluation_failures: AtomicU64,

    /// Events passed to the no-route handler
    unrouted_events: AtomicU64,

    /// Raw records that no component took
    unrouted_raw: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            batches_routed: AtomicU64::new(0),
            records_received: AtomicU64::new(0),
            component_deliveries: AtomicU64::new(0),
            records_delivered: AtomicU64::new(0),
            empty_deliveries_skipped: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            evaluation_failures: AtomicU64::new(0),
            unrouted_events: AtomicU64::new(0),
            unrouted_raw: AtomicU64::new(0),
        }
    }

    /// Record a batch entering the router
    #[inline]
    pub fn record_batch(&self, record_count: u64) {
        self.batches_routed.fetch_add(1, Ordering::Relaxed);
        self.records_received
            .fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record a successful consumer call
    #[inline]
    pub fn record_delivery(&self, record_count: u64) {
        self.component_deliveries.fetch_add(1, Ordering::Relaxed);
        self.records_delivered
            .fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record a component skipped with nothing to deliver
    #[inline]
    pub fn record_empty_skipped(&self) {
        self.empty_deliveries_skipped
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed consumer call
    #[inline]
    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record route predicate failures
    #[inline]
    pub fn record_evaluation_failures(&self, count: u64) {
        self.evaluation_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record records left unclaimed after all components ran
    #[inline]
    pub fn record_unrouted(&self, events: u64, raw: u64) {
        self.unrouted_events.fetch_add(events, Ordering::Relaxed);
        self.unrouted_raw.fetch_add(raw, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_routed: self.batches_routed.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            component_deliveries: self.component_deliveries.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            empty_deliveries_skipped: self.empty_deliveries_skipped.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            evaluation_failures: self.evaluation_failures.load(Ordering::Relaxed),
            unrouted_events: self.unrouted_events.load(Ordering::Relaxed),
            unrouted_raw: self.unrouted_raw.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    ///
    /// Not atomic across counters; use for tests and periodic reporting only.
    pub fn reset(&self) {
        self.batches_routed.store(0, Ordering::Relaxed);
        self.records_received.store(0, Ordering::Relaxed);
        self.component_deliveries.store(0, Ordering::Relaxed);
        self.records_delivered.store(0, Ordering::Relaxed);
        self.empty_deliveries_skipped.store(0, Ordering::Relaxed);
        self.delivery_failures.store(0, Ordering::Relaxed);
        self.evaluation_failures.store(0, Ordering::Relaxed);
        self.unrouted_events.store(0, Ordering::Relaxed);
        self.unrouted_raw.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of router metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batches passed to `route`
    pub batches_routed: u64,
    /// Records received across all batches
    pub records_received: u64,
    /// Consumer calls that succeeded
    pub component_deliveries: u64,
    /// Records handed to consumers
    pub records_delivered: u64,
    /// Components skipped with nothing to deliver
    pub empty_deliveries_skipped: u64,
    /// Consumer calls that failed
    pub delivery_failures: u64,
    /// Route predicates that failed
    pub evaluation_failures: u64,
    /// Events passed to the no-route handler
    pub unrouted_events: u64,
    /// Raw records no component took
    pub unrouted_raw: u64,
}

impl MetricsSnapshot {
    /// Average number of deliveries per received record
    ///
    /// Above 1.0 means records fan out to several components.
    /// Returns None if no records have been received.
    #[inline]
    pub fn fan_out_ratio(&self) -> Option<f64> {
        if self.records_received == 0 {
            None
        } else {
            Some(self.records_delivered as f64 / self.records_received as f64)
        }
    }

    /// Fraction of received records that no component took
    ///
    /// Returns None if no records have been received.
    #[inline]
    pub fn unrouted_rate(&self) -> Option<f64> {
        if self.records_received == 0 {
            None
        } else {
            let unrouted = self.unrouted_events + self.unrouted_raw;
            Some(unrouted as f64 / self.records_received as f64)
        }
    }

    /// Calculate the difference from another snapshot
    #[inline]
    pub fn diff(&self, previous: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_routed: self.batches_routed.saturating_sub(previous.batches_routed),
            records_received: self
                .records_received
                .saturating_sub(previous.records_received),
            component_deliveries: self
                .component_deliveries
                .saturating_sub(previous.component_deliveries),
            records_delivered: self
                .records_delivered
                .saturating_sub(previous.records_delivered),
            empty_deliveries_skipped: self
                .empty_deliveries_skipped
                .saturating_sub(previous.empty_deliveries_skipped),
            delivery_failures: self
                .delivery_failures
                .saturating_sub(previous.delivery_failures),
            evaluation_failures: self
                .evaluation_failures
                .saturating_sub(previous.evaluation_failures),
            unrouted_events: self
                .unrouted_events
                .saturating_sub(previous.unrouted_events),
            unrouted_raw: self.unrouted_raw.saturating_sub(previous.unrouted_raw),
        }
    }
}

// ============================================================================
// Evaluation failure log - rate-limited warnings
// ============================================================================

/// Rate-limited logging of route evaluation failures
///
/// A misconfigured route can fail on every event. Failures are aggregated
/// and a summary with one sample is logged at most once per interval.
/// The first failure is logged immediately.
///
/// # Thread Safety
///
/// All operations use atomics and are safe for concurrent access.
#[derive(Debug)]
pub struct EvaluationFailureLog {
    /// Failures in current interval
    interval_failures: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;

impl EvaluationFailureLog {
    /// Create a new tracker
    pub const fn new() -> Self {
        Self {
            interval_failures: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(0),
        }
    }

    /// Record failures from one batch and log if the interval elapsed
    ///
    /// Returns true if a log was emitted.
    pub fn record(&self, failures: &[EvaluationFailure]) -> bool {
        let Some(sample) = failures.last() else {
            return false;
        };
        self.interval_failures
            .fetch_add(failures.len() as u64, Ordering::Relaxed);

        let now = now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Claim the log slot so concurrent callers don't log twice
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let count = self.interval_failures.swap(0, Ordering::Relaxed);
        if count == 0 {
            return false;
        }

        tracing::warn!(
            failures = count,
            route = %sample.route,
            record = sample.record_index,
            error = %sample.error,
            "route evaluation failed, treated as no match"
        );

        true
    }

    /// Failures counted since the last log (for testing)
    #[cfg(test)]
    pub fn pending(&self) -> u64 {
        self.interval_failures.load(Ordering::Relaxed)
    }
}

impl Default for EvaluationFailureLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Current epoch milliseconds
#[inline]
fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
