//! Per-component selection and delivery

use sluice_model::Record;

use crate::component::DataFlowComponent;
use crate::evaluator::RouteMap;
use crate::strategy::RecordStrategy;
use crate::unrouted::UnroutedSet;

/// Batch positions selected for one component, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    /// Selected positions
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected records
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was selected
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over selected positions
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

/// Selects and delivers the records destined for a single component
#[derive(Debug, Clone, Copy)]
pub struct DataFlowComponentRouter {
    skip_empty: bool,
}

impl Default for DataFlowComponentRouter {
    fn default() -> Self {
        Self { skip_empty: true }
    }
}

impl DataFlowComponentRouter {
    /// Create a component router
    ///
    /// With `skip_empty` set, a component with no eligible records is not
    /// called at all. Otherwise it receives an empty delivery.
    pub fn new(skip_empty: bool) -> Self {
        Self { skip_empty }
    }

    /// Whether empty deliveries are skipped
    #[inline]
    pub fn skip_empty_deliveries(&self) -> bool {
        self.skip_empty
    }

    /// Positions of the records eligible for `component`
    ///
    /// Unconditional components take every record. Otherwise a record is
    /// eligible when its matched routes intersect the component's routes.
    pub fn select<C>(&self, component: &DataFlowComponent<C>, route_map: &RouteMap) -> Selection {
        let indices = if component.is_unconditional() {
            (0..route_map.len()).collect()
        } else {
            route_map
                .iter()
                .enumerate()
                .filter(|(_, matched)| matched.intersects(component.routes()))
                .map(|(i, _)| i)
                .collect()
        };
        Selection { indices }
    }

    /// Register every component's selection as planned destinations
    ///
    /// Run once per batch before the first delivery, so strategies see the
    /// full fan-out of each record whatever the component order.
    pub fn plan<C>(
        &self,
        components: &[DataFlowComponent<C>],
        route_map: &RouteMap,
        unrouted: &mut UnroutedSet,
    ) {
        for component in components {
            unrouted.plan(self.select(component, route_map).iter());
        }
    }

    /// Hand the selected records to `on_delivered` in one call
    ///
    /// Each record goes through `strategy` with its current fan-out from
    /// `unrouted`. Returns whether `on_delivered` was called.
    ///
    /// # Errors
    ///
    /// Returns the error from `on_delivered` unchanged.
    pub fn deliver<C, F, E>(
        &self,
        records: &[Record],
        component: &DataFlowComponent<C>,
        selection: &Selection,
        strategy: &dyn RecordStrategy,
        unrouted: &UnroutedSet,
        on_delivered: &mut F,
    ) -> Result<bool, E>
    where
        F: FnMut(&C, Vec<Record>) -> Result<(), E>,
    {
        if selection.is_empty() && self.skip_empty {
            return Ok(false);
        }

        let batch: Vec<Record> = selection
            .iter()
            .filter_map(|i| {
                records
                    .get(i)
                    .map(|record| strategy.get_record(record, unrouted.fan_out(i)))
            })
            .collect();

        on_delivered(component.component(), batch)?;
        Ok(true)
    }

    /// Select, deliver and claim the records for one component
    ///
    /// The selection is claimed in `unrouted` whether or not `on_delivered`
    /// succeeds: records handed to a failing consumer are not unrouted.
    pub fn route<C, F, E>(
        &self,
        records: &[Record],
        component: &DataFlowComponent<C>,
        route_map: &RouteMap,
        strategy: &dyn RecordStrategy,
        unrouted: &mut UnroutedSet,
        mut on_delivered: F,
    ) -> Delivery<E>
    where
        F: FnMut(&C, Vec<Record>) -> Result<(), E>,
    {
        let selection = self.select(component, route_map);
        let result = self.deliver(
            records,
            component,
            &selection,
            strategy,
            unrouted,
            &mut on_delivered,
        );
        unrouted.claim(selection.iter());
        Delivery { selection, result }
    }
}

/// Outcome of routing one component
#[derive(Debug)]
pub struct Delivery<E> {
    /// Records selected for the component
    pub selection: Selection,
    /// `Ok(true)` when the consumer ran, `Ok(false)` when an empty delivery
    /// was skipped, or the consumer's error
    pub result: Result<bool, E>,
}
