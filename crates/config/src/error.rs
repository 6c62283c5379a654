//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Two routes share a name
    #[error("route '{name}' is defined more than once")]
    DuplicateRoute {
        /// The duplicated route name
        name: String,
    },

    /// Two components share a name
    #[error("component '{name}' is defined more than once")]
    DuplicateComponent {
        /// The duplicated component name
        name: String,
    },

    /// A component references a route that no `[[routes]]` entry defines
    #[error("component '{component}' references unknown route '{route}'")]
    UnknownRoute {
        /// Component declaring the route
        component: String,
        /// Name of the missing route
        route: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Section type (e.g., "route", "component")
        component: &'static str,
        /// Name of the entry
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Section type
        component: &'static str,
        /// Name of the entry
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a DuplicateRoute error
    pub fn duplicate_route(name: impl Into<String>) -> Self {
        Self::DuplicateRoute { name: name.into() }
    }

    /// Create a DuplicateComponent error
    pub fn duplicate_component(name: impl Into<String>) -> Self {
        Self::DuplicateComponent { name: name.into() }
    }

    /// Create an UnknownRoute error
    pub fn unknown_route(component: impl Into<String>, route: impl Into<String>) -> Self {
        Self::UnknownRoute {
            component: component.into(),
            route: route.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
