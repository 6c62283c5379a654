//! Record - single-payload container
//!
//! A record carries either an `Event` (eligible for route evaluation) or raw
//! bytes (never evaluated, never handed to the no-route handler).

use bytes::Bytes;
use serde_json::Value;

use crate::event::Event;

/// Record payload
#[derive(Debug, Clone)]
pub enum Payload {
    /// Structured event, subject to route evaluation
    Event(Event),
    /// Opaque bytes, passed through untouched
    Raw(Bytes),
}

/// A record flowing through a pipeline stage
///
/// `Clone` is shallow: the clone shares the event with the original.
/// Use `deep_copy` when the copy must be isolated from the original.
#[derive(Debug, Clone)]
pub struct Record {
    payload: Payload,
}

impl Record {
    /// Create a record from a payload
    #[inline]
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    /// Create a record carrying an event
    #[inline]
    pub fn from_event(event: Event) -> Self {
        Self::new(Payload::Event(event))
    }

    /// Create a record carrying raw bytes
    #[inline]
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(Payload::Raw(data.into()))
    }

    /// Decode a line of input into a record
    ///
    /// Lines holding a JSON object become event records with the given type;
    /// anything else is kept as a raw record.
    pub fn from_line(event_type: &str, line: &str) -> Self {
        Self::from_bytes(event_type, Bytes::copy_from_slice(line.as_bytes()))
    }

    /// Decode raw input bytes into a record
    ///
    /// Like `from_line`, but accepts any bytes. Input that is not UTF-8 or
    /// not a JSON object is kept as a raw record with the bytes untouched.
    pub fn from_bytes(event_type: &str, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(map)) => Self::from_event(Event::from_map(event_type, map)),
            _ => Self::raw(data),
        }
    }

    /// The record payload
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the record and return its payload
    #[inline]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// The event, if the payload is one
    #[inline]
    pub fn as_event(&self) -> Option<&Event> {
        match &self.payload {
            Payload::Event(event) => Some(event),
            Payload::Raw(_) => None,
        }
    }

    /// The raw bytes, if the payload is raw
    #[inline]
    pub fn as_raw(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Raw(bytes) => Some(bytes),
            Payload::Event(_) => None,
        }
    }

    /// Whether the payload is an event
    #[inline]
    pub fn is_event(&self) -> bool {
        matches!(self.payload, Payload::Event(_))
    }

    /// Create an isolated copy
    ///
    /// Events are deep-copied (data, metadata and tags). Raw bytes are
    /// immutable, so the copy shares the underlying buffer.
    pub fn deep_copy(&self) -> Self {
        match &self.payload {
            Payload::Event(event) => Self::from_event(event.deep_copy()),
            Payload::Raw(bytes) => Self::raw(bytes.clone()),
        }
    }

    /// Reference identity: true if both records share the same payload
    pub fn ptr_eq(&self, other: &Record) -> bool {
        match (&self.payload, &other.payload) {
            (Payload::Event(a), Payload::Event(b)) => Event::ptr_eq(a, b),
            (Payload::Raw(a), Payload::Raw(b)) => a.as_ptr() == b.as_ptr() && a.len() == b.len(),
            _ => false,
        }
    }
}

impl From<Event> for Record {
    fn from(event: Event) -> Self {
        Self::from_event(event)
    }
}

impl From<Bytes> for Record {
    fn from(bytes: Bytes) -> Self {
        Self::raw(bytes)
    }
}
