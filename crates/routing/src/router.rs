//! Router - per-batch routing orchestrator
//!
//! Routes a batch of records to the components whose routes the records
//! match, and hands every event nobody took to the no-route handler.
//!
//! # Design
//!
//! - Routes are evaluated once per batch, not once per component
//! - Each component gets at most one consumer call per batch
//! - Per-batch bookkeeping lives on the stack; the router itself is
//!   immutable apart from atomic metrics, so `route` can run concurrently
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use sluice_model::{Event, Record};
//! use sluice_routing::{DataFlowComponent, IdentityStrategy, Route, Router};
//! use serde_json::json;
//!
//! let router = Router::builder()
//!     .route(Route::from_fn("errors", |event| {
//!         Ok(event.get("level")? == Some(json!("error")))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let components = vec![DataFlowComponent::new("alerts", "alerts", ["errors"])];
//! let records = vec![Record::from_event(Event::new("log", json!({"level": "error"})).unwrap())];
//!
//! let summary = router
//!     .route(&records, &components, &IdentityStrategy, |_, delivered| {
//!         assert_eq!(delivered.len(), 1);
//!         Ok::<(), Infallible>(())
//!     })
//!     .unwrap();
//! assert_eq!(summary.unrouted_events, 0);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sluice_config::{Config, DeliveryFailureMode};
use sluice_model::{Event, Payload, Record};
use tracing::{debug, info, trace, warn};

use crate::component::DataFlowComponent;
use crate::component_router::{DataFlowComponentRouter, Delivery};
use crate::error::{ComponentFailure, DeliveryError, Result, RoutingError};
use crate::evaluator::RouteEventEvaluator;
use crate::metrics::{EvaluationFailureLog, RouterMetrics};
use crate::route::Route;
use crate::strategy::RecordStrategy;
use crate::unrouted::UnroutedSet;

/// Handler invoked with each event no component took
pub type NoRouteHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// What `route` does when a consumer fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryFailurePolicy {
    /// Return the first failure; later components and the no-route pass
    /// are skipped
    #[default]
    Abort,
    /// Attempt every component and the no-route pass, then report all
    /// failures together
    Continue,
}

impl From<DeliveryFailureMode> for DeliveryFailurePolicy {
    fn from(mode: DeliveryFailureMode) -> Self {
        match mode {
            DeliveryFailureMode::Abort => Self::Abort,
            DeliveryFailureMode::Continue => Self::Continue,
        }
    }
}

/// Outcome of one `route` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteSummary {
    /// Records in the batch
    pub records: usize,
    /// Consumer calls that succeeded
    pub components_delivered: usize,
    /// Records handed to successful consumers, counted per component
    pub records_delivered: usize,
    /// Events passed to the no-route handler
    pub unrouted_events: usize,
    /// Raw records no component took
    pub unrouted_raw: usize,
    /// Route predicates that failed and counted as no match
    pub evaluation_failures: usize,
}

/// Content-based record router
///
/// Built once from a route list, then shared across workers.
pub struct Router {
    evaluator: RouteEventEvaluator,
    component_router: DataFlowComponentRouter,
    failure_policy: DeliveryFailurePolicy,
    no_route: Option<NoRouteHandler>,
    metrics: Arc<RouterMetrics>,
    failure_log: EvaluationFailureLog,
}

impl Router {
    /// Start building a router
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Route evaluator
    #[inline]
    pub fn evaluator(&self) -> &RouteEventEvaluator {
        &self.evaluator
    }

    /// Configured routes, in evaluation order
    #[inline]
    pub fn routes(&self) -> &[Route] {
        self.evaluator.routes()
    }

    /// Delivery failure policy
    #[inline]
    pub fn failure_policy(&self) -> DeliveryFailurePolicy {
        self.failure_policy
    }

    /// Whether components with nothing selected are skipped
    #[inline]
    pub fn skip_empty_deliveries(&self) -> bool {
        self.component_router.skip_empty_deliveries()
    }

    /// Router metrics
    #[inline]
    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    /// Shared handle to the metrics, for reporters
    pub fn metrics_handle(&self) -> Arc<RouterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Check that every route a component subscribes to is defined
    ///
    /// `route` itself accepts unknown names; they simply never match.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::UnknownRoute` for the first undefined name.
    pub fn validate_component<C>(&self, component: &DataFlowComponent<C>) -> Result<()> {
        for name in component.routes().sorted() {
            if !self.evaluator.has_route(name) {
                return Err(RoutingError::unknown_route(component.name(), name));
            }
        }
        Ok(())
    }

    /// Route a batch to the components
    ///
    /// Evaluates routes once and plans every component's selection, then for
    /// each component in order selects the records whose matched routes
    /// intersect the component's routes (all records for unconditional
    /// components), turns each into a delivery instance through `strategy`,
    /// and calls `consumer` once with them.
    /// Finally every event no component took goes to the no-route handler.
    /// Raw records are never evaluated and never reach the handler.
    ///
    /// # Errors
    ///
    /// With `DeliveryFailurePolicy::Abort`, returns
    /// `DeliveryError::Component` at the first consumer failure. With
    /// `Continue`, returns `DeliveryError::Partial` after every component
    /// and the no-route pass ran. Records handed to a failed consumer count
    /// as claimed.
    pub fn route<C, F, E>(
        &self,
        records: &[Record],
        components: &[DataFlowComponent<C>],
        strategy: &dyn RecordStrategy,
        mut consumer: F,
    ) -> std::result::Result<RouteSummary, DeliveryError<E>>
    where
        F: FnMut(&C, Vec<Record>) -> std::result::Result<(), E>,
        E: fmt::Display,
    {
        self.metrics.record_batch(records.len() as u64);

        let route_map = self.evaluator.evaluate(records);
        let evaluation_failures = route_map.failures();
        if !evaluation_failures.is_empty() {
            self.metrics
                .record_evaluation_failures(evaluation_failures.len() as u64);
            self.failure_log.record(evaluation_failures);
        }

        let mut summary = RouteSummary {
            records: records.len(),
            evaluation_failures: evaluation_failures.len(),
            ..RouteSummary::default()
        };
        let mut unrouted = UnroutedSet::new(records.len());
        let mut failures = Vec::new();

        self.component_router.plan(components, &route_map, &mut unrouted);

        for (position, component) in components.iter().enumerate() {
            let Delivery { selection, result } = self.component_router.route(
                records,
                component,
                &route_map,
                strategy,
                &mut unrouted,
                &mut consumer,
            );

            match result {
                Ok(true) => {
                    self.metrics.record_delivery(selection.len() as u64);
                    summary.components_delivered += 1;
                    summary.records_delivered += selection.len();
                    debug!(
                        component = component.name(),
                        records = selection.len(),
                        strategy = strategy.name(),
                        "delivered records"
                    );
                }
                Ok(false) => {
                    self.metrics.record_empty_skipped();
                    trace!(component = component.name(), "no records selected, skipping");
                }
                Err(error) => {
                    self.metrics.record_delivery_failure();
                    warn!(
                        component = component.name(),
                        position,
                        records = selection.len(),
                        policy = ?self.failure_policy,
                        error = %error,
                        "component delivery failed"
                    );
                    match self.failure_policy {
                        DeliveryFailurePolicy::Abort => {
                            return Err(DeliveryError::Component {
                                component: component.name().to_string(),
                                position,
                                source: error,
                            });
                        }
                        DeliveryFailurePolicy::Continue => failures.push(ComponentFailure {
                            component: component.name().to_string(),
                            position,
                            error,
                        }),
                    }
                }
            }
        }

        for index in unrouted.iter() {
            match records.get(index).map(Record::payload) {
                Some(Payload::Event(event)) => {
                    if let Some(handler) = &self.no_route {
                        handler(event);
                    }
                    summary.unrouted_events += 1;
                }
                Some(Payload::Raw(_)) => summary.unrouted_raw += 1,
                None => {}
            }
        }

        self.metrics
            .record_unrouted(summary.unrouted_events as u64, summary.unrouted_raw as u64);
        if summary.unrouted_events > 0 {
            debug!(
                events = summary.unrouted_events,
                "events matched no component"
            );
        }

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(DeliveryError::Partial { failures, summary })
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.evaluator.routes().len())
            .field("skip_empty_deliveries", &self.skip_empty_deliveries())
            .field("failure_policy", &self.failure_policy)
            .field("no_route_handler", &self.no_route.is_some())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Builder for `Router`
pub struct RouterBuilder {
    routes: Vec<Route>,
    skip_empty: bool,
    failure_policy: DeliveryFailurePolicy,
    no_route: Option<NoRouteHandler>,
    metrics: Option<Arc<RouterMetrics>>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    /// Create a builder with no routes and default settings
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            skip_empty: true,
            failure_policy: DeliveryFailurePolicy::default(),
            no_route: None,
            metrics: None,
        }
    }

    /// Create a builder from configuration
    ///
    /// Compiles `[[routes]]` into condition predicates and applies the
    /// `[router]` settings. Components are not part of the router; build
    /// them with `DataFlowComponent::from_config`.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::InvalidCondition` if a condition cannot be
    /// compiled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let routes = config
            .routes
            .iter()
            .map(Route::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new()
            .routes(routes)
            .skip_empty_deliveries(config.router.skip_empty_deliveries)
            .failure_policy(config.router.on_delivery_failure.into()))
    }

    /// Add a route
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Add several routes
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Skip consumer calls for components with nothing selected
    /// Default: true
    #[must_use]
    pub fn skip_empty_deliveries(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Set the delivery failure policy
    /// Default: Abort
    #[must_use]
    pub fn failure_policy(mut self, policy: DeliveryFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the handler for events no component took
    /// Default: none (unrouted events are only counted)
    #[must_use]
    pub fn no_route_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&Event) + Send + Sync + 'static,
    {
        self.no_route = Some(Arc::new(handler));
        self
    }

    /// Share an existing metrics instance
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<RouterMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the router
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::DuplicateRoute` if two routes share a name.
    pub fn build(self) -> Result<Router> {
        let mut seen = HashSet::with_capacity(self.routes.len());
        for route in &self.routes {
            if !seen.insert(route.name().as_str()) {
                return Err(RoutingError::duplicate_route(route.name().as_str()));
            }
        }

        info!(
            routes = self.routes.len(),
            skip_empty_deliveries = self.skip_empty,
            failure_policy = ?self.failure_policy,
            no_route_handler = self.no_route.is_some(),
            "router built"
        );

        Ok(Router {
            evaluator: RouteEventEvaluator::new(self.routes),
            component_router: DataFlowComponentRouter::new(self.skip_empty),
            failure_policy: self.failure_policy,
            no_route: self.no_route,
            metrics: self.metrics.unwrap_or_default(),
            failure_log: EvaluationFailureLog::new(),
        })
    }
}
