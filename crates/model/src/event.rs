//! Event - structured document carried by a record
//!
//! Events are handles to shared, lock-protected state. Routing only reads
//! events; downstream components may mutate them, which is why fan-out
//! delivery can ask for an isolated `deep_copy`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{EventError, Result};
use crate::key::EventKey;

/// Metadata attached to every event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    /// Event type (e.g. "log", "trace", "event")
    event_type: String,

    /// When the event entered the pipeline
    time_received: DateTime<Utc>,

    /// Tags added by pipeline components
    tags: BTreeSet<String>,
}

impl EventMetadata {
    /// Create metadata stamped with the current time
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            time_received: Utc::now(),
            tags: BTreeSet::new(),
        }
    }

    /// Override the receive time
    #[must_use]
    pub fn with_time_received(mut self, time: DateTime<Utc>) -> Self {
        self.time_received = time;
        self
    }

    /// Event type
    #[inline]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Time the event was received
    #[inline]
    pub fn time_received(&self) -> DateTime<Utc> {
        self.time_received
    }

    /// Tags in sorted order
    #[inline]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

#[derive(Debug)]
struct EventState {
    data: Map<String, Value>,
    metadata: EventMetadata,
}

/// A structured event
///
/// # Identity
///
/// `Clone` copies the handle, not the data: both handles point at the same
/// event and `Event::ptr_eq` returns true. `deep_copy` produces a new event
/// with its own data, metadata and tags.
///
/// # Example
///
/// ```
/// use sluice_model::Event;
/// use serde_json::json;
///
/// let event = Event::new("log", json!({"status": 200})).unwrap();
/// let shared = event.clone();
/// let copy = event.deep_copy();
///
/// event.put("status", json!(500)).unwrap();
/// assert_eq!(shared.get("status").unwrap(), Some(json!(500)));
/// assert_eq!(copy.get("status").unwrap(), Some(json!(200)));
/// ```
#[derive(Clone)]
pub struct Event {
    state: Arc<RwLock<EventState>>,
}

impl Event {
    /// Create an event from a JSON object
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidRoot` if `data` is not an object.
    pub fn new(event_type: impl Into<String>, data: Value) -> Result<Self> {
        match data {
            Value::Object(map) => Ok(Self::from_map(event_type, map)),
            other => Err(EventError::InvalidRoot(json_type_name(&other))),
        }
    }

    /// Create an event from an already-built JSON map
    pub fn from_map(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self::with_metadata(data, EventMetadata::new(event_type))
    }

    /// Create an event with explicit metadata
    pub fn with_metadata(data: Map<String, Value>, metadata: EventMetadata) -> Self {
        Self {
            state: Arc::new(RwLock::new(EventState { data, metadata })),
        }
    }

    /// Parse an event from a JSON object string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or not an object.
    pub fn from_json(event_type: impl Into<String>, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::new(event_type, value)
    }

    /// Event type from metadata
    pub fn event_type(&self) -> String {
        self.state.read().metadata.event_type.clone()
    }

    /// Time the event was received
    pub fn time_received(&self) -> DateTime<Utc> {
        self.state.read().metadata.time_received
    }

    /// Copy of the event metadata
    pub fn metadata(&self) -> EventMetadata {
        self.state.read().metadata.clone()
    }

    /// Get a copy of the value at `key`
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidKey` if the key cannot be parsed.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = EventKey::parse(key)?;
        Ok(self.get_at(&key))
    }

    /// Get a copy of the value at a pre-parsed key
    pub fn get_at(&self, key: &EventKey) -> Option<Value> {
        self.with_value_at(key, |value| value.cloned())
    }

    /// Borrow the value at `key` for the duration of `f`
    ///
    /// Avoids cloning when the caller only needs to inspect the value.
    /// The read lock is held while `f` runs.
    pub fn with_value_at<R>(&self, key: &EventKey, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let state = self.state.read();
        f(lookup(&state.data, key.segments()))
    }

    /// Check whether a value exists at `key`
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidKey` if the key cannot be parsed.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        let key = EventKey::parse(key)?;
        Ok(self.with_value_at(&key, |value| value.is_some()))
    }

    /// Set the value at `key`, creating intermediate objects as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an intermediate segment
    /// already holds a non-object value.
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let key = EventKey::parse(key)?;
        self.put_at(&key, value.into())
    }

    /// Set the value at a pre-parsed key
    ///
    /// # Errors
    ///
    /// Returns `EventError::NotAnObject` if an intermediate segment holds a
    /// non-object value.
    pub fn put_at(&self, key: &EventKey, value: Value) -> Result<()> {
        let mut state = self.state.write();
        let (last, parents) = match key.segments().split_last() {
            Some(split) => split,
            None => return Err(EventError::invalid_key(key.as_str(), "key is empty")),
        };

        let mut current = &mut state.data;
        for segment in parents {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => return Err(EventError::not_an_object(key.as_str(), segment.as_str())),
            };
        }

        current.insert(last.clone(), value);
        Ok(())
    }

    /// Remove the value at `key`, returning it if present
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidKey` if the key cannot be parsed.
    pub fn delete(&self, key: &str) -> Result<Option<Value>> {
        let key = EventKey::parse(key)?;
        let mut state = self.state.write();
        let Some((last, parents)) = key.segments().split_last() else {
            return Ok(None);
        };

        let mut current = &mut state.data;
        for segment in parents {
            current = match current.get_mut(segment) {
                Some(Value::Object(map)) => map,
                _ => return Ok(None),
            };
        }

        Ok(current.remove(last))
    }

    /// Snapshot of the event data as a JSON value
    pub fn to_json(&self) -> Value {
        Value::Object(self.state.read().data.clone())
    }

    /// Serialize the event data to a compact JSON string
    pub fn to_json_string(&self) -> String {
        let state = self.state.read();
        // Map<String, Value> always serializes
        serde_json::to_string(&state.data).unwrap_or_default()
    }

    /// Add a tag to the event metadata
    pub fn add_tag(&self, tag: impl Into<String>) {
        self.state.write().metadata.tags.insert(tag.into());
    }

    /// Check whether the event carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.state.read().metadata.tags.contains(tag)
    }

    /// Tags in sorted order
    pub fn tags(&self) -> Vec<String> {
        self.state.read().metadata.tags.iter().cloned().collect()
    }

    /// Reference identity: true if both handles point at the same event
    #[inline]
    pub fn ptr_eq(a: &Event, b: &Event) -> bool {
        Arc::ptr_eq(&a.state, &b.state)
    }

    /// Create an independent event with copied data, metadata and tags
    pub fn deep_copy(&self) -> Self {
        let state = self.state.read();
        Self::with_metadata(state.data.clone(), state.metadata.clone())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Event")
            .field("event_type", &state.metadata.event_type)
            .field("fields", &state.data.len())
            .field("tags", &state.metadata.tags)
            .finish()
    }
}

/// Walk `segments` from the root object
fn lookup<'a>(root: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get(first)?;

    for segment in rest {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }

    Some(current)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
