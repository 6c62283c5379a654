//! Sluice - Model
//!
//! The data entities that flow through a pipeline stage:
//! - `Event` - Structured JSON document with metadata, shared by reference
//! - `Record` - Single-payload container, holding an `Event` or raw bytes
//! - `EventKey` - Parsed field path used to read and write event data
//!
//! # Identity
//!
//! An `Event` is a handle to shared state. Cloning the handle is cheap and
//! both clones observe the same data (`Event::ptr_eq` is true). Use
//! `Event::deep_copy` or `Record::deep_copy` to get an independent instance.
//!
//! # Example
//!
//! ```
//! use sluice_model::{Event, Record};
//! use serde_json::json;
//!
//! let event = Event::new("log", json!({"level": "error", "user": {"id": 7}})).unwrap();
//! let record = Record::from_event(event.clone());
//!
//! assert_eq!(event.get("user.id").unwrap(), Some(json!(7)));
//! assert!(record.is_event());
//! ```

mod error;
mod event;
mod key;
mod record;

pub use error::{EventError, Result};
pub use event::{Event, EventMetadata};
pub use key::EventKey;
pub use record::{Payload, Record};

// Re-export for convenience
pub use bytes::Bytes;

/// Event type assigned to records decoded from JSON lines
pub const DEFAULT_EVENT_TYPE: &str = "event";
