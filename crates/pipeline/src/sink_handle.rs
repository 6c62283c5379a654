//! Sink handle for pipeline communication
//!
//! `SinkHandle` wraps a channel sender and sink name, allowing the stage to
//! send record batches to sinks without knowing their concrete types.

use sluice_model::Record;
use tokio::sync::mpsc;

/// Handle to a sink for sending record batches
///
/// The stage delivers each component's share of a batch through its
/// handle. The receiving side is owned by whatever consumes the records.
///
/// # Example
///
/// ```
/// use sluice_pipeline::SinkHandle;
///
/// let (handle, mut rx) = SinkHandle::channel("archive", 16);
/// handle.try_send(Vec::new()).unwrap();
/// assert!(rx.try_recv().unwrap().is_empty());
/// ```
#[derive(Clone)]
pub struct SinkHandle {
    /// Human-readable name for debugging/metrics
    name: String,

    /// Channel sender for record batches
    sender: mpsc::Sender<Vec<Record>>,
}

impl SinkHandle {
    /// Create a new sink handle
    #[inline]
    pub fn new(name: impl Into<String>, sender: mpsc::Sender<Vec<Record>>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Create a handle together with a bounded channel
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Vec<Record>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(name, tx), rx)
    }

    /// Get the sink's name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a reference to the underlying sender
    #[inline]
    pub fn sender(&self) -> &mpsc::Sender<Vec<Record>> {
        &self.sender
    }

    /// Try to send a batch without blocking
    ///
    /// Returns `Ok(())` if the batch was sent, or the batch back if the
    /// channel is full (backpressure) or closed.
    #[inline]
    pub fn try_send(&self, batch: Vec<Record>) -> Result<(), Vec<Record>> {
        self.sender.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(b) => b,
            mpsc::error::TrySendError::Closed(b) => b,
        })
    }

    /// Send a batch, waiting if the channel is full
    ///
    /// Returns `Ok(())` if the batch was sent, or the batch back if the
    /// channel is closed.
    #[inline]
    pub async fn send(&self, batch: Vec<Record>) -> Result<(), Vec<Record>> {
        self.sender.send(batch).await.map_err(|e| e.0)
    }

    /// Send a batch from synchronous code, blocking the thread while full
    ///
    /// Must not be called from an async context; the stage calls it from
    /// the blocking pool.
    #[inline]
    pub fn blocking_send(&self, batch: Vec<Record>) -> Result<(), Vec<Record>> {
        self.sender.blocking_send(batch).map_err(|e| e.0)
    }

    /// Check if the sink channel is closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Get the current capacity of the channel
    #[inline]
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }

    /// Get the maximum capacity of the channel
    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
