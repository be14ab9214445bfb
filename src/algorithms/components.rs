//! Connected components by label propagation
//!
//! Edges are followed in both directions, so the result is the weakly
//! connected components of a directed graph. Every vertex starts labelled
//! with its own id and keeps the smallest label offered by any neighbor; at
//! the fixed point each component carries its minimum vertex id.

use crate::comm::{Communicator, LocalComm};
use crate::engine::{traverse, EngineConfig, Relax, RoundStats};
use crate::storage::{Adjacency, CsrGraph, VertexId, Weight};
use anyhow::Result;
use std::collections::HashSet;

/// Result of a components run
#[derive(Debug, Clone)]
pub struct Components {
    /// Smallest vertex id in each vertex's component
    pub labels: Vec<VertexId>,
    /// Per-round trace
    pub rounds: Vec<RoundStats>,
}

impl Components {
    /// Number of distinct components
    #[must_use]
    pub fn count(&self) -> usize {
        self.labels.iter().collect::<HashSet<_>>().len()
    }

    /// Whether `u` and `v` share a component
    ///
    /// # Panics
    ///
    /// Panics if either vertex is out of range.
    #[must_use]
    pub fn connected(&self, u: VertexId, v: VertexId) -> bool {
        self.labels[u as usize] == self.labels[v as usize]
    }
}

struct MinLabel;

impl Relax for MinLabel {
    fn initial_value(&self, v: VertexId) -> i64 {
        i64::from(v)
    }

    fn seeds(&self, num_nodes: usize) -> Vec<VertexId> {
        #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
        let all = (0..num_nodes).map(|v| v as VertexId).collect();
        all
    }

    fn propagate(&self, value: i64, _weight: Weight) -> Option<i64> {
        Some(value)
    }

    fn symmetric(&self) -> bool {
        true
    }
}

/// Label every vertex with the minimum vertex id of its component
///
/// # Errors
///
/// Does not fail for a well-formed graph; the `Result` matches the other
/// algorithms.
///
/// # Example
///
/// ```
/// use frontier_graph::{connected_components, CsrGraph};
///
/// let graph = CsrGraph::from_edges(5, &[(1, 0), (3, 4)]).unwrap();
///
/// let components = connected_components(&graph).unwrap();
/// assert_eq!(components.labels, vec![0, 0, 2, 3, 3]);
/// assert_eq!(components.count(), 3);
/// ```
pub fn connected_components(graph: &CsrGraph) -> Result<Components> {
    connected_components_with_config(graph, EngineConfig::default())
}

/// Components with an explicit engine configuration
///
/// # Errors
///
/// Same as [`connected_components`].
pub fn connected_components_with_config(
    graph: &CsrGraph,
    config: EngineConfig,
) -> Result<Components> {
    connected_components_on(graph, &LocalComm, config)
}

/// Components over any adjacency and communicator (one call per rank)
///
/// # Errors
///
/// Same as [`connected_components`].
pub fn connected_components_on<A, C>(
    adjacency: &A,
    comm: &C,
    config: EngineConfig,
) -> Result<Components>
where
    A: Adjacency,
    C: Communicator,
{
    let traversal = traverse(adjacency, comm, &MinLabel, config);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Labels are vertex ids
    let labels = traversal
        .values
        .into_iter()
        .map(|label| label as VertexId)
        .collect();

    Ok(Components {
        labels,
        rounds: traversal.rounds,
    })
}
