//! Model error types

use thiserror::Error;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors that can occur when reading or writing event data
#[derive(Debug, Error)]
pub enum EventError {
    /// Field key is empty or contains an empty segment
    #[error("invalid event key '{key}': {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// A write walked through a value that is not an object
    #[error("cannot write '{key}': segment '{segment}' is not an object")]
    NotAnObject {
        /// Full key being written
        key: String,
        /// Segment that resolved to a non-object
        segment: String,
    },

    /// Event data root must be a JSON object
    #[error("event data must be a JSON object, got {0}")]
    InvalidRoot(&'static str),

    /// Event JSON could not be parsed
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EventError {
    /// Create an InvalidKey error
    #[inline]
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// Create a NotAnObject error
    #[inline]
    pub fn not_an_object(key: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotAnObject {
            key: key.into(),
            segment: segment.into(),
        }
    }
}
