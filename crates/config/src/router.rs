//! Router configuration
//!
//! Tunables for the routing core: empty-delivery policy, delivery failure
//! handling and which record strategy isolates fan-out deliveries.
//!
//! # Example
//!
//! ```toml
//! [router]
//! skip_empty_deliveries = true
//! on_delivery_failure = "continue"
//! record_strategy = "copy_on_fan_out"
//! ```

use serde::Deserialize;

/// What the router does when a component's consumer fails
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailureMode {
    /// Stop the batch at the first failure; skip the no-route pass
    #[default]
    Abort,
    /// Attempt every component, then report all failures together
    Continue,
}

/// Which record instance each component receives
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStrategyKind {
    /// Every component shares the original record
    #[default]
    Identity,
    /// Every component gets its own deep copy
    Isolate,
    /// First component gets the original, later ones get deep copies
    CopyOnFanOut,
}

impl RecordStrategyKind {
    /// Config spelling of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Isolate => "isolate",
            Self::CopyOnFanOut => "copy_on_fan_out",
        }
    }
}

/// Router tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Skip the consumer call for components that selected no records
    /// Default: true
    pub skip_empty_deliveries: bool,

    /// Behavior when a consumer fails
    /// Default: abort
    pub on_delivery_failure: DeliveryFailureMode,

    /// Record instance policy for deliveries
    /// Default: identity
    pub record_strategy: RecordStrategyKind,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            skip_empty_deliveries: true,
            on_delivery_failure: DeliveryFailureMode::Abort,
            record_strategy: RecordStrategyKind::Identity,
        }
    }
}
