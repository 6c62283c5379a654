//! Sluice - Pipeline
//!
//! The stage driver that feeds record batches through the router and into
//! sink channels.
//!
//! # Architecture
//!
//! ```text
//! [Input]                          [Stage]                        [Sinks]
//!                                                            ┌──→ alerts
//!   mpsc::Receiver<Vec<Record>> ──→ Router ──→ per-component ─┼──→ archive
//!                                    │        Vec<Record>     └──→ metrics
//!                                    └──→ no-route handler (tag "unrouted")
//! ```
//!
//! # Key Design
//!
//! - **Channel-based**: Uses `tokio::sync::mpsc` for batches in and out
//! - **Blocking pool**: Routing runs in `spawn_blocking` since sink sends
//!   wait while a channel is full
//! - **Sharded workers**: `run_sharded` shares one stage across workers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sluice_model::Record;
//! use sluice_pipeline::{SinkHandle, Stage};
//! use sluice_routing::DataFlowComponent;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> sluice_pipeline::Result<()> {
//! let (archive, mut archive_rx) = SinkHandle::channel("archive", 1000);
//! let stage = Stage::builder()
//!     .component(DataFlowComponent::unconditional("archive", archive))
//!     .build()?;
//!
//! let (tx, rx) = mpsc::channel::<Vec<Record>>(1000);
//! tokio::spawn(Arc::new(stage).run(rx));
//! tokio::spawn(async move {
//!     while let Some(records) = archive_rx.recv().await {
//!         println!("archived {} records", records.len());
//!     }
//! });
//! # drop(tx);
//! # Ok(())
//! # }
//! ```

mod error;
mod metrics;
mod sink_handle;
mod stage;

pub use error::{PipelineError, Result};
pub use metrics::{StageMetrics, StageMetricsSnapshot};
pub use sink_handle::SinkHandle;
pub use stage::{Stage, StageBuilder, UNROUTED_TAG};

/// Default channel buffer size for sink channels
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;
