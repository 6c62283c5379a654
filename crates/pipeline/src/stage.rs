//! Stage - drives record batches through the router into sinks
//!
//! A stage owns a `Router`, the components (each wrapping a `SinkHandle`)
//! and the active record strategy. Batches arrive on an mpsc channel and
//! are routed on the blocking pool, because sink sends block while a sink
//! channel is full.

use std::collections::HashMap;
use std::sync::Arc;

use sluice_config::Config;
use sluice_model::Record;
use sluice_routing::{
    DataFlowComponent, DeliveryFailurePolicy, IdentityStrategy, RecordStrategy, Route,
    RouteSummary, Router, RouterBuilder, RouterMetrics, strategy_for,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::sink_handle::SinkHandle;

/// Tag added to events no component took
pub const UNROUTED_TAG: &str = "unrouted";

/// A routing stage
pub struct Stage {
    router: Router,
    components: Vec<DataFlowComponent<SinkHandle>>,
    strategy: Arc<dyn RecordStrategy>,
    metrics: Arc<StageMetrics>,
}

impl Stage {
    /// Start building a stage
    pub fn builder() -> StageBuilder {
        StageBuilder::new()
    }

    /// The router
    #[inline]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Components in delivery order
    #[inline]
    pub fn components(&self) -> &[DataFlowComponent<SinkHandle>] {
        &self.components
    }

    /// Active record strategy name
    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Stage metrics
    #[inline]
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Router metrics
    #[inline]
    pub fn router_metrics(&self) -> &RouterMetrics {
        self.router.metrics()
    }

    /// Route one batch, blocking while a sink channel is full
    ///
    /// Must run outside an async context (see `run`).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Delivery` when a sink channel is closed,
    /// shaped by the router's failure policy.
    pub fn route_batch(&self, records: Vec<Record>) -> Result<RouteSummary> {
        self.metrics.record_batch(records.len() as u64);

        let result = self.router.route(
            &records,
            &self.components,
            self.strategy.as_ref(),
            |sink: &SinkHandle, delivered| {
                sink.blocking_send(delivered)
                    .map_err(|_| PipelineError::SinkClosed(sink.name().to_string()))
            },
        );

        result.map_err(|err| {
            self.metrics.record_failed();
            PipelineError::from(err)
        })
    }

    /// Process batches until the input channel closes
    ///
    /// Each batch is routed on the blocking pool. Delivery errors are
    /// logged and the stage moves on to the next batch.
    pub async fn run(self: Arc<Self>, receiver: mpsc::Receiver<Vec<Record>>) {
        tracing::info!(
            components = self.components.len(),
            routes = self.router.routes().len(),
            strategy = self.strategy.name(),
            "stage starting"
        );

        Self::process(Arc::clone(&self), receiver, 0).await;

        let stage = self.metrics.snapshot();
        let router = self.router.metrics().snapshot();
        tracing::info!(
            batches_received = stage.batches_received,
            records_received = stage.records_received,
            batches_failed = stage.batches_failed,
            unrouted_events = stage.unrouted_events,
            component_deliveries = router.component_deliveries,
            evaluation_failures = router.evaluation_failures,
            "stage shutting down"
        );
    }

    /// Run one worker per receiver, all sharing this stage
    ///
    /// Returns the worker handles; each finishes when its channel closes.
    pub fn run_sharded(self: Arc<Self>, receivers: Vec<mpsc::Receiver<Vec<Record>>>) -> Vec<JoinHandle<()>> {
        let worker_count = receivers.len();

        tracing::info!(
            components = self.components.len(),
            routes = self.router.routes().len(),
            strategy = self.strategy.name(),
            worker_count,
            "stage starting (sharded mode)"
        );

        receivers
            .into_iter()
            .enumerate()
            .map(|(worker_id, receiver)| {
                let stage = Arc::clone(&self);
                tokio::spawn(async move {
                    tracing::debug!(worker_id, "stage worker starting");
                    Self::process(stage, receiver, worker_id).await;
                    tracing::debug!(worker_id, "stage worker stopping");
                })
            })
            .collect()
    }

    async fn process(stage: Arc<Self>, mut receiver: mpsc::Receiver<Vec<Record>>, worker_id: usize) {
        while let Some(batch) = receiver.recv().await {
            let stage = Arc::clone(&stage);
            match tokio::task::spawn_blocking(move || stage.route_batch(batch)).await {
                Ok(Ok(summary)) => {
                    tracing::trace!(
                        worker_id,
                        records = summary.records,
                        components = summary.components_delivered,
                        "batch routed"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(worker_id, error = %e, "batch delivery failed");
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "routing task failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("router", &self.router)
            .field("components", &self.components.len())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// Builder for `Stage`
pub struct StageBuilder {
    router: RouterBuilder,
    components: Vec<DataFlowComponent<SinkHandle>>,
    strategy: Arc<dyn RecordStrategy>,
}

impl Default for StageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StageBuilder {
    /// Create a builder with no routes, no components and the identity strategy
    pub fn new() -> Self {
        Self {
            router: RouterBuilder::new(),
            components: Vec::new(),
            strategy: Arc::new(IdentityStrategy),
        }
    }

    /// Create a builder from configuration and sink handles
    ///
    /// Every enabled component needs a handle in `sinks`, keyed by component
    /// name. Disabled components are left out; extra handles are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a route fails to compile or an enabled component
    /// has no handle.
    pub fn from_config(config: &Config, mut sinks: HashMap<String, SinkHandle>) -> Result<Self> {
        let router = RouterBuilder::from_config(config)?;

        let components = config
            .enabled_components()
            .map(|c| {
                sinks
                    .remove(&c.name)
                    .map(|sink| DataFlowComponent::from_config(c, sink))
                    .ok_or_else(|| PipelineError::MissingSink(c.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            router,
            components,
            strategy: strategy_for(config.router.record_strategy),
        })
    }

    /// Add a route
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.router = self.router.route(route);
        self
    }

    /// Add a component; delivery follows insertion order
    #[must_use]
    pub fn component(mut self, component: DataFlowComponent<SinkHandle>) -> Self {
        self.components.push(component);
        self
    }

    /// Set the record strategy
    #[must_use]
    pub fn strategy(mut self, strategy: Arc<dyn RecordStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the delivery failure policy
    #[must_use]
    pub fn failure_policy(mut self, policy: DeliveryFailurePolicy) -> Self {
        self.router = self.router.failure_policy(policy);
        self
    }

    /// Build the stage
    ///
    /// The no-route handler tags each unrouted event with `UNROUTED_TAG`.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate routes or a component referencing an
    /// unknown route.
    pub fn build(self) -> Result<Stage> {
        let metrics = Arc::new(StageMetrics::new());
        let handler_metrics = Arc::clone(&metrics);

        let router = self
            .router
            .no_route_handler(move |event| {
                event.add_tag(UNROUTED_TAG);
                handler_metrics.record_unrouted();
                tracing::debug!(event_type = %event.event_type(), "event matched no component");
            })
            .build()?;

        for component in &self.components {
            router.validate_component(component)?;
        }

        tracing::info!(
            components = self.components.len(),
            strategy = self.strategy.name(),
            "stage built"
        );

        Ok(Stage {
            router,
            components: self.components,
            strategy: self.strategy,
            metrics,
        })
    }
}
