//! Event field keys
//!
//! Keys address a value inside the event's JSON tree. Two spellings are
//! accepted and resolve to the same path:
//! - dot notation: `user.email`
//! - pointer notation: `/user/email`

use std::fmt;

use crate::error::{EventError, Result};

/// A parsed, validated field path
///
/// Parse once at build time (e.g. when compiling route conditions) and reuse
/// on the hot path to avoid re-splitting the key for every event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    raw: String,
    segments: Vec<String>,
}

impl EventKey {
    /// Parse a key in dot or pointer notation
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidKey` if the key is empty or any segment is empty.
    pub fn parse(key: &str) -> Result<Self> {
        let body = match key.strip_prefix('/') {
            Some(rest) => (rest, '/'),
            None => (key, '.'),
        };

        if body.0.is_empty() {
            return Err(EventError::invalid_key(key, "key is empty"));
        }

        let segments: Vec<String> = body.0.split(body.1).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(EventError::invalid_key(key, "key contains an empty segment"));
        }

        Ok(Self {
            raw: key.to_string(),
            segments,
        })
    }

    /// The key as originally written
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Path segments from the root of the event
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<&str> for EventKey {
    type Error = EventError;

    fn try_from(key: &str) -> Result<Self> {
        Self::parse(key)
    }
}
