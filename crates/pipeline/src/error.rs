//! Pipeline error types
//!
//! Error types for building and running a routing stage.

use sluice_routing::{DeliveryError, RoutingError};
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Sink channel is closed
    #[error("sink channel closed: {0}")]
    SinkClosed(String),

    /// An enabled component has no sink handle
    #[error("no sink handle for component '{0}'")]
    MissingSink(String),

    /// Router or component setup failed
    #[error("routing setup failed: {0}")]
    Routing(#[from] RoutingError),

    /// One or more sinks rejected a batch
    #[error(transparent)]
    Delivery(Box<DeliveryError<PipelineError>>),
}

impl From<DeliveryError<PipelineError>> for PipelineError {
    fn from(err: DeliveryError<PipelineError>) -> Self {
        Self::Delivery(Box::new(err))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
