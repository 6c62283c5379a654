//! Routing error types
//!
//! Three families, matching where they surface:
//! - `RoutingError` - configuration problems, raised while building a router
//! - `EvaluationError` - a predicate failed for one event, recovered as "not matched"
//! - `DeliveryError` - a component consumer failed, returned from `Router::route`

use sluice_model::EventError;
use thiserror::Error;

use crate::router::RouteSummary;

/// Result type for router construction
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while compiling routes or building a router
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Two routes share a name
    #[error("duplicate route '{name}'")]
    DuplicateRoute {
        /// Name defined more than once
        name: String,
    },

    /// A component references a route no predicate defines
    #[error("component '{component}' references unknown route '{route}'")]
    UnknownRoute {
        /// Component declaring the route
        component: String,
        /// Name of the missing route
        route: String,
    },

    /// A route condition is malformed
    #[error("invalid condition in route '{route}': {message}")]
    InvalidCondition {
        /// Route owning the condition
        route: String,
        /// What is wrong with it
        message: String,
    },
}

impl RoutingError {
    /// Create a DuplicateRoute error
    #[inline]
    pub fn duplicate_route(name: impl Into<String>) -> Self {
        Self::DuplicateRoute { name: name.into() }
    }

    /// Create an UnknownRoute error
    #[inline]
    pub fn unknown_route(component: impl Into<String>, route: impl Into<String>) -> Self {
        Self::UnknownRoute {
            component: component.into(),
            route: route.into(),
        }
    }

    /// Create an InvalidCondition error
    #[inline]
    pub fn invalid_condition(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCondition {
            route: route.into(),
            message: message.into(),
        }
    }
}

/// A route predicate failed to evaluate against one event
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Field holds a value the operator cannot compare
    #[error("field '{field}' is {actual}, expected {expected}")]
    TypeMismatch {
        /// Field key
        field: String,
        /// What the operator needs
        expected: &'static str,
        /// JSON type actually found
        actual: &'static str,
    },

    /// Reading the event failed
    #[error("event access failed: {0}")]
    Event(#[from] EventError),

    /// Failure reported by a custom predicate
    #[error("{0}")]
    Custom(String),
}

impl EvaluationError {
    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Create a Custom error
    #[inline]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// A component consumer failure that was collected instead of aborting
#[derive(Debug)]
pub struct ComponentFailure<E> {
    /// Name of the failed component
    pub component: String,
    /// Position of the component in the delivery order
    pub position: usize,
    /// Error returned by the consumer
    pub error: E,
}

/// Errors returned from `Router::route`
#[derive(Debug, Error)]
pub enum DeliveryError<E> {
    /// The consumer failed and the batch was aborted
    ///
    /// Components after `position` were not attempted and no-route
    /// handling was skipped.
    #[error("delivery to component '{component}' failed: {source}")]
    Component {
        /// Name of the failed component
        component: String,
        /// Position of the component in the delivery order
        position: usize,
        /// Error returned by the consumer
        #[source]
        source: E,
    },

    /// One or more consumers failed; every component was attempted
    #[error("delivery failed for {} component(s)", .failures.len())]
    Partial {
        /// Each failed component, in delivery order
        failures: Vec<ComponentFailure<E>>,
        /// Outcome of the batch, including no-route handling
        summary: RouteSummary,
    },
}

impl<E> DeliveryError<E> {
    /// Names of the components that failed
    pub fn failed_components(&self) -> Vec<&str> {
        match self {
            Self::Component { component, .. } => vec![component.as_str()],
            Self::Partial { failures, .. } => {
                failures.iter().map(|f| f.component.as_str()).collect()
            }
        }
    }
}
