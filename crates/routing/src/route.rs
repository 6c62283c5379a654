//! Routes and route sets
//!
//! A route is a named predicate over an event. Route names are interned as
//! `RouteName` (`Arc<str>`) so route sets clone cheaply per record.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;
use std::sync::Arc;

use sluice_model::Event;

use crate::error::EvaluationError;

/// Name of a route
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteName(Arc<str>);

impl RouteName {
    /// Create a route name
    #[inline]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RouteName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for RouteName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An unordered set of route names
///
/// Used both for the routes an event matched and the routes a component
/// subscribes to. Order carries no meaning and duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    names: HashSet<RouteName>,
}

impl RouteSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route name, returning false if it was already present
    pub fn insert(&mut self, name: impl Into<RouteName>) -> bool {
        self.names.insert(name.into())
    }

    /// Check membership by name
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of distinct names
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over names in arbitrary order
    pub fn iter(&self) -> hash_set::Iter<'_, RouteName> {
        self.names.iter()
    }

    /// Whether the two sets share at least one name
    pub fn intersects(&self, other: &RouteSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.names.iter().any(|name| large.names.contains(name))
    }

    /// Names sorted alphabetically, for logs and display
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(RouteName::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<N: Into<RouteName>> FromIterator<N> for RouteSet {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RouteSet {
    type Item = &'a RouteName;
    type IntoIter = hash_set::Iter<'a, RouteName>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// Predicate deciding whether an event belongs to a route
///
/// Implementations must be pure: the same event state always gives the
/// same answer, and the event is never modified. The router may evaluate
/// predicates from several threads at once.
pub trait RoutePredicate: Send + Sync {
    /// Test the event
    ///
    /// # Errors
    ///
    /// An error means the predicate could not decide. The evaluator logs
    /// it and treats the route as not matched for this event.
    fn test(&self, event: &Event) -> Result<bool, EvaluationError>;
}

impl<F> RoutePredicate for F
where
    F: Fn(&Event) -> Result<bool, EvaluationError> + Send + Sync,
{
    fn test(&self, event: &Event) -> Result<bool, EvaluationError> {
        self(event)
    }
}

/// A named route
#[derive(Clone)]
pub struct Route {
    name: RouteName,
    predicate: Arc<dyn RoutePredicate>,
}

impl Route {
    /// Create a route from a predicate
    pub fn new(name: impl Into<RouteName>, predicate: impl RoutePredicate + 'static) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Create a route from a closure
    ///
    /// Same as `new`, but pins the closure signature so argument types
    /// need no annotation.
    pub fn from_fn<F>(name: impl Into<RouteName>, f: F) -> Self
    where
        F: Fn(&Event) -> Result<bool, EvaluationError> + Send + Sync + 'static,
    {
        Self::new(name, f)
    }

    /// Route name
    #[inline]
    pub fn name(&self) -> &RouteName {
        &self.name
    }

    /// Evaluate the predicate against an event
    ///
    /// # Errors
    ///
    /// Propagates the predicate's evaluation error.
    #[inline]
    pub fn test(&self, event: &Event) -> Result<bool, EvaluationError> {
        self.predicate.test(event)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("name", &self.name).finish_non_exhaustive()
    }
}
