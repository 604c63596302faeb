//! Producer/consumer edges recovered by stack simulation.
//!
//! Every time the simulator pops a value it records which instruction pushed it. The
//! [`DataFlowMap`] collects these edges across all simulated paths. It only ever grows, and an
//! identical (consumer, position, producer) triple is stored once no matter how many paths
//! observe it.
//!
//! The map is keyed by consumer offset and backed by a [`DashMap`], so paths simulated on
//! different threads can record into the same map.

use std::collections::BTreeSet;

use dashmap::DashMap;

/// One data-flow edge: the value popped by `consumer` at `position` was pushed by `producer`.
///
/// Position 0 is the value that was on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataFlowSource {
    /// Offset of the instruction that popped the value
    pub consumer: usize,
    /// Pop position, 0 being the top of the stack
    pub position: usize,
    /// Offset of the instruction that pushed the value
    pub producer: usize,
}

/// All data-flow edges of a method, grouped by consumer.
#[derive(Debug, Default)]
pub struct DataFlowMap {
    edges: DashMap<usize, Vec<DataFlowSource>>,
}

impl DataFlowMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        DataFlowMap {
            edges: DashMap::new(),
        }
    }

    /// Records an edge. Returns `false` if the same edge was already present.
    pub fn record(&self, consumer: usize, position: usize, producer: usize) -> bool {
        let source = DataFlowSource {
            consumer,
            position,
            producer,
        };

        let mut entry = self.edges.entry(consumer).or_default();
        if entry.contains(&source) {
            return false;
        }
        entry.push(source);
        true
    }

    /// Edges recorded for `consumer`, ordered by position then producer.
    #[must_use]
    pub fn sources(&self, consumer: usize) -> Vec<DataFlowSource> {
        let mut sources = self
            .edges
            .get(&consumer)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        sources.sort_unstable();
        sources
    }

    /// Distinct producers seen for `consumer` at `position`, in ascending offset order.
    #[must_use]
    pub fn producers(&self, consumer: usize, position: usize) -> Vec<usize> {
        let Some(entry) = self.edges.get(&consumer) else {
            return Vec::new();
        };

        entry
            .iter()
            .filter(|source| source.position == position)
            .map(|source| source.producer)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Offsets of every instruction with at least one recorded edge, ascending.
    #[must_use]
    pub fn consumers(&self) -> Vec<usize> {
        let mut consumers: Vec<usize> = self.edges.iter().map(|entry| *entry.key()).collect();
        consumers.sort_unstable();
        consumers
    }

    /// `true` if some instruction popped a value pushed by `producer`.
    #[must_use]
    pub fn is_consumed(&self, producer: usize) -> bool {
        self.edges
            .iter()
            .any(|entry| entry.value().iter().any(|source| source.producer == producer))
    }

    /// Every recorded edge in canonical order.
    #[must_use]
    pub fn edges(&self) -> Vec<DataFlowSource> {
        let mut edges: Vec<DataFlowSource> = self
            .edges
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Number of distinct edges
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.iter().map(|entry| entry.value().len()).sum()
    }

    /// `true` if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
