//! Record strategies
//!
//! A strategy decides which record instance each component receives. The
//! router asks once per (record, component) delivery and passes the record's
//! `FanOut`: how many components already received it in the current batch and
//! how many were selected to receive it in total. The totals are fixed before
//! the first consumer runs.

use std::sync::Arc;

use sluice_config::RecordStrategyKind;
use sluice_model::Record;

/// Destinations of one record within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Components that already received the record
    pub prior: usize,
    /// Components selected to receive the record, this one included
    pub total: usize,
}

impl FanOut {
    /// Create a fan-out; `total` is raised to cover the current delivery
    pub fn new(prior: usize, total: usize) -> Self {
        Self {
            prior,
            total: total.max(prior + 1),
        }
    }

    /// A record with exactly one destination
    pub fn single() -> Self {
        Self::new(0, 1)
    }

    /// Whether more than one component receives the record
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.total > 1
    }
}

/// Chooses the record instance handed to a component
pub trait RecordStrategy: Send + Sync {
    /// Record to deliver in place of `original`
    ///
    /// The result must carry an equivalent payload; it may be the original
    /// itself or an isolated copy.
    fn get_record(&self, original: &Record, fan_out: FanOut) -> Record;

    /// Strategy name for logs
    fn name(&self) -> &'static str;
}

/// Delivers the original record to every component
///
/// All components share one event; a mutation by one is visible to the
/// components after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStrategy;

impl RecordStrategy for IdentityStrategy {
    #[inline]
    fn get_record(&self, original: &Record, _fan_out: FanOut) -> Record {
        original.clone()
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Delivers an isolated copy to every component
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolatingStrategy;

impl RecordStrategy for IsolatingStrategy {
    fn get_record(&self, original: &Record, _fan_out: FanOut) -> Record {
        original.deep_copy()
    }

    fn name(&self) -> &'static str {
        "isolate"
    }
}

/// Delivers the original to single destinations, copies on fan-out
///
/// A record taken by one component is passed through untouched. A record
/// taken by several gets a deep copy per component and the original is
/// handed to none of them, so no consumer can mutate what another receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOnFanOutStrategy;

impl RecordStrategy for CopyOnFanOutStrategy {
    fn get_record(&self, original: &Record, fan_out: FanOut) -> Record {
        if fan_out.is_shared() {
            original.deep_copy()
        } else {
            original.clone()
        }
    }

    fn name(&self) -> &'static str {
        "copy_on_fan_out"
    }
}

/// Strategy for a configured kind
pub fn strategy_for(kind: RecordStrategyKind) -> Arc<dyn RecordStrategy> {
    match kind {
        RecordStrategyKind::Identity => Arc::new(IdentityStrategy),
        RecordStrategyKind::Isolate => Arc::new(IsolatingStrategy),
        RecordStrategyKind::CopyOnFanOut => Arc::new(CopyOnFanOutStrategy),
    }
}
