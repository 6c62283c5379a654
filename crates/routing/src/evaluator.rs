//! Route evaluation
//!
//! Evaluates every route against every event in a batch and returns a
//! `RouteMap`: one `RouteSet` per record, by position. Raw records are never
//! evaluated and always get an empty set.

use std::sync::Arc;

use sluice_model::Record;
use tracing::{debug, trace};

use crate::error::EvaluationError;
use crate::route::{Route, RouteName, RouteSet};

/// A predicate that failed for one record
#[derive(Debug)]
pub struct EvaluationFailure {
    /// Position of the record in the batch
    pub record_index: usize,
    /// Route whose predicate failed
    pub route: RouteName,
    /// The error it reported
    pub error: EvaluationError,
}

/// Matched routes per record, parallel to the evaluated batch
#[derive(Debug, Default)]
pub struct RouteMap {
    sets: Vec<RouteSet>,
    failures: Vec<EvaluationFailure>,
}

impl RouteMap {
    /// Number of entries (equals the batch length)
    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the map is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Routes matched by the record at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Option<&RouteSet> {
        self.sets.get(index)
    }

    /// Iterate over route sets in batch order
    pub fn iter(&self) -> std::slice::Iter<'_, RouteSet> {
        self.sets.iter()
    }

    /// Predicate failures seen while building the map
    pub fn failures(&self) -> &[EvaluationFailure] {
        &self.failures
    }
}

/// Evaluates a fixed list of routes against record batches
///
/// The route list is immutable and shared, so one evaluator can serve any
/// number of concurrent batches.
#[derive(Debug, Clone)]
pub struct RouteEventEvaluator {
    routes: Arc<[Route]>,
}

impl RouteEventEvaluator {
    /// Create an evaluator over `routes`
    pub fn new(routes: impl Into<Arc<[Route]>>) -> Self {
        Self {
            routes: routes.into(),
        }
    }

    /// Routes in evaluation order
    #[inline]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Whether a route with this name is defined
    pub fn has_route(&self, name: &str) -> bool {
        self.routes.iter().any(|r| r.name().as_str() == name)
    }

    /// Evaluate every route against every event record
    ///
    /// A predicate error is logged at debug, recorded in `RouteMap::failures` and
    /// treated as "not matched". It never aborts the batch.
    pub fn evaluate(&self, records: &[Record]) -> RouteMap {
        let mut sets = Vec::with_capacity(records.len());
        let mut failures = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let mut matched = RouteSet::new();

            if let Some(event) = record.as_event() {
                for route in self.routes.iter() {
                    match route.test(event) {
                        Ok(true) => {
                            matched.insert(route.name().clone());
                        }
                        Ok(false) => {}
                        Err(error) => {
                            debug!(
                                route = %route.name(),
                                record = index,
                                error = %error,
                                "route evaluation failed, treating as no match"
                            );
                            failures.push(EvaluationFailure {
                                record_index: index,
                                route: route.name().clone(),
                                error,
                            });
                        }
                    }
                }
            } else {
                trace!(record = index, "raw record, skipping route evaluation");
            }

            sets.push(matched);
        }

        RouteMap { sets, failures }
    }
}
