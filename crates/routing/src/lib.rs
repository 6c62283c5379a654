//! Sluice - Routing
//!
//! Content-based fan-out of record batches to downstream components.
//!
//! # Design
//!
//! Routes are named predicates over events. Each downstream component
//! declares the routes it subscribes to, or none to receive everything.
//! Per batch the router:
//!
//! 1. Evaluates every route against every event once (`RouteEventEvaluator`)
//! 2. Plans each record's fan-out: how many components will take it
//! 3. For each component, selects the records whose matched routes intersect
//!    its own (`DataFlowComponentRouter`) and delivers them in one call,
//!    each record instantiated through a `RecordStrategy`
//! 4. Hands every event no component took to the no-route handler
//!
//! Records are identified by position in the batch, so the per-batch route
//! map is a plain `Vec` parallel to it.
//!
//! # Guarantees
//!
//! - Every record is either delivered to at least one component or left
//!   unrouted, never both and never neither
//! - Each component gets at most one consumer call per batch
//! - Raw records are never evaluated and never reach the no-route handler
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use sluice_model::{Bytes, Event, Record};
//! use sluice_routing::{DataFlowComponent, IdentityStrategy, Route, Router};
//! use serde_json::json;
//!
//! let router = Router::builder()
//!     .route(Route::from_fn("a", |e| Ok(e.get("type")? == Some(json!("A")))))
//!     .no_route_handler(|event| println!("unrouted: {}", event.to_json_string()))
//!     .build()
//!     .unwrap();
//!
//! let components = vec![
//!     DataFlowComponent::new("only_a", 1, ["a"]),
//!     DataFlowComponent::unconditional("everything", 2),
//! ];
//! let records = vec![
//!     Record::from_event(Event::new("event", json!({"type": "A"})).unwrap()),
//!     Record::raw(Bytes::from_static(b"opaque")),
//! ];
//!
//! let mut calls = Vec::new();
//! router
//!     .route(&records, &components, &IdentityStrategy, |id, delivered| {
//!         calls.push((*id, delivered.len()));
//!         Ok::<(), Infallible>(())
//!     })
//!     .unwrap();
//! assert_eq!(calls, vec![(1, 1), (2, 2)]);
//! ```

mod component;
mod component_router;
mod error;
mod evaluator;
mod metrics;
mod route;
mod router;
mod strategy;
mod unrouted;

pub mod condition;

#[cfg(test)]
mod router_test;

pub use component::DataFlowComponent;
pub use component_router::{DataFlowComponentRouter, Delivery, Selection};
pub use error::{ComponentFailure, DeliveryError, EvaluationError, Result, RoutingError};
pub use evaluator::{EvaluationFailure, RouteEventEvaluator, RouteMap};
pub use metrics::{EvaluationFailureLog, MetricsSnapshot, RouterMetrics};
pub use route::{Route, RouteName, RoutePredicate, RouteSet};
pub use router::{DeliveryFailurePolicy, NoRouteHandler, RouteSummary, Router, RouterBuilder};
pub use strategy::{
    CopyOnFanOutStrategy, FanOut, IdentityStrategy, IsolatingStrategy, RecordStrategy,
    strategy_for,
};
pub use unrouted::UnroutedSet;
