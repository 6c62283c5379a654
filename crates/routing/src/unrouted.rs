//! Tracking which records no component has taken yet

use crate::strategy::FanOut;

/// Per-record delivery counts for one batch
///
/// Starts with every record unclaimed. A record stays in the set until at
/// least one component delivery includes it. Alongside the delivery counts
/// the set keeps the planned number of destinations per record; together
/// they form the `FanOut` handed to record strategies.
#[derive(Debug, Clone)]
pub struct UnroutedSet {
    deliveries: Vec<u32>,
    targets: Vec<u32>,
    remaining: usize,
}

impl UnroutedSet {
    /// Create a set covering `len` records, all unclaimed
    pub fn new(len: usize) -> Self {
        Self {
            deliveries: vec![0; len],
            targets: vec![0; len],
            remaining: len,
        }
    }

    /// How many component deliveries included the record so far
    #[inline]
    pub fn deliveries(&self, index: usize) -> usize {
        self.deliveries.get(index).map_or(0, |&n| n as usize)
    }

    /// Register one more planned destination for each record
    ///
    /// Out-of-range indices are ignored.
    pub fn plan(&mut self, indices: impl IntoIterator<Item = usize>) {
        for index in indices {
            if let Some(count) = self.targets.get_mut(index) {
                *count = count.saturating_add(1);
            }
        }
    }

    /// Planned destinations of the record
    #[inline]
    pub fn targets(&self, index: usize) -> usize {
        self.targets.get(index).map_or(0, |&n| n as usize)
    }

    /// Fan-out of the record for its next delivery
    pub fn fan_out(&self, index: usize) -> FanOut {
        FanOut::new(self.deliveries(index), self.targets(index))
    }

    /// Mark records as delivered once more
    ///
    /// Out-of-range indices are ignored.
    pub fn claim(&mut self, indices: impl IntoIterator<Item = usize>) {
        for index in indices {
            if let Some(count) = self.deliveries.get_mut(index) {
                if *count == 0 {
                    self.remaining -= 1;
                }
                *count = count.saturating_add(1);
            }
        }
    }

    /// Whether the record has not been delivered anywhere
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.deliveries.get(index) == Some(&0)
    }

    /// Number of unclaimed records
    #[inline]
    pub fn len(&self) -> usize {
        self.remaining
    }

    /// Whether every record has been claimed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Indices of unclaimed records, ascending
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.deliveries
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| i)
    }
}
