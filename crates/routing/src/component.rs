//! Downstream components as seen by the router

use sluice_config::ComponentConfig;

use crate::route::{RouteName, RouteSet};

/// A downstream component paired with the routes gating delivery to it
///
/// `C` is whatever the caller delivers to: a sink handle, a channel, an
/// index into its own table. The router never inspects it. An empty route
/// set makes the component unconditional.
#[derive(Debug, Clone)]
pub struct DataFlowComponent<C> {
    name: String,
    component: C,
    routes: RouteSet,
}

impl<C> DataFlowComponent<C> {
    /// Create a component subscribed to `routes`
    pub fn new<I, N>(name: impl Into<String>, component: C, routes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RouteName>,
    {
        Self {
            name: name.into(),
            component,
            routes: routes.into_iter().collect(),
        }
    }

    /// Create a component that receives every record
    pub fn unconditional(name: impl Into<String>, component: C) -> Self {
        Self {
            name: name.into(),
            component,
            routes: RouteSet::new(),
        }
    }

    /// Create a component from its configuration entry
    pub fn from_config(config: &ComponentConfig, component: C) -> Self {
        Self::new(config.name.as_str(), component, config.routes.iter().map(String::as_str))
    }

    /// Component name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped component
    #[inline]
    pub fn component(&self) -> &C {
        &self.component
    }

    /// Routes gating delivery
    #[inline]
    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }

    /// Whether the component receives every record
    #[inline]
    pub fn is_unconditional(&self) -> bool {
        self.routes.is_empty()
    }

    /// Unwrap the component
    pub fn into_component(self) -> C {
        self.component
    }
}
