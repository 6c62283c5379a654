//! Stage configuration
//!
//! Sizing for the stage driver that feeds batches into the router.

use serde::Deserialize;

/// Stage driver settings
///
/// All fields have sensible defaults - you only need to specify what you want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Number of router workers (shards) routing batches concurrently
    /// Default: 1
    pub workers: usize,

    /// Capacity of each component's record channel (in batches)
    /// Default: 1000
    pub channel_size: usize,

    /// Records per batch when reading line-based input
    /// Default: 100
    pub batch_size: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            channel_size: 1000,
            batch_size: 100,
        }
    }
}
