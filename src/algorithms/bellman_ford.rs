//! Single-source shortest paths with signed weights
//!
//! Frontier-driven Bellman-Ford: only vertices whose distance dropped in the
//! previous round relax their edges. Without a negative cycle reachable from
//! the root, updates stop within `num_nodes - 1` rounds; still updating at
//! round `num_nodes` means such a cycle exists, and the distances are then
//! unreliable.

use super::check_root;
use crate::comm::{Communicator, LocalComm};
use crate::engine::{traverse, EngineConfig, Relax, RoundStats, INFINITY};
use crate::error::GraphError;
use crate::storage::{Adjacency, CsrGraph, NodeId, VertexId, Weight};
use anyhow::Result;

/// Result of a Bellman-Ford run
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    /// Distance from the root; [`INFINITY`] if unreachable
    pub distances: Vec<i64>,
    /// A negative cycle is reachable from the root; `distances` are not final
    pub negative_cycle: bool,
    /// Per-round trace
    pub rounds: Vec<RoundStats>,
}

impl ShortestPaths {
    /// Distance to `node`, or `None` if unreachable
    #[must_use]
    pub fn distance(&self, node: NodeId) -> Option<i64> {
        self.distances
            .get(node.0 as usize)
            .copied()
            .filter(|&d| d != INFINITY)
    }
}

struct Weighted {
    root: VertexId,
}

impl Relax for Weighted {
    fn initial_value(&self, v: VertexId) -> i64 {
        if v == self.root {
            0
        } else {
            INFINITY
        }
    }

    fn seeds(&self, _num_nodes: usize) -> Vec<VertexId> {
        vec![self.root]
    }

    fn propagate(&self, value: i64, weight: Weight) -> Option<i64> {
        (value != INFINITY).then(|| value.saturating_add(weight))
    }

    fn max_rounds(&self, num_nodes: usize) -> Option<usize> {
        Some(num_nodes)
    }
}

/// Bellman-Ford from `root`
///
/// # Errors
///
/// Returns [`GraphError::MissingWeights`] for an unweighted graph, or
/// [`GraphError::VertexOutOfRange`] if `root` is not a vertex.
///
/// # Example
///
/// ```
/// use frontier_graph::{bellman_ford, CsrGraph, NodeId};
///
/// let graph = CsrGraph::from_weighted_edges(3, &[(0, 1, 4), (1, 2, -1), (0, 2, 5)]).unwrap();
///
/// let paths = bellman_ford(&graph, NodeId(0)).unwrap();
/// assert_eq!(paths.distances, vec![0, 4, 3]);
/// assert!(!paths.negative_cycle);
/// ```
pub fn bellman_ford(graph: &CsrGraph, root: NodeId) -> Result<ShortestPaths> {
    bellman_ford_with_config(graph, root, EngineConfig::default())
}

/// Bellman-Ford with an explicit engine configuration
///
/// # Errors
///
/// Same as [`bellman_ford`].
pub fn bellman_ford_with_config(
    graph: &CsrGraph,
    root: NodeId,
    config: EngineConfig,
) -> Result<ShortestPaths> {
    bellman_ford_on(graph, &LocalComm, root, config)
}

/// Bellman-Ford over any adjacency and communicator (one call per rank)
///
/// # Errors
///
/// Same as [`bellman_ford`].
pub fn bellman_ford_on<A, C>(
    adjacency: &A,
    comm: &C,
    root: NodeId,
    config: EngineConfig,
) -> Result<ShortestPaths>
where
    A: Adjacency,
    C: Communicator,
{
    if !adjacency.is_weighted() {
        return Err(GraphError::MissingWeights {
            algorithm: "Bellman-Ford",
        }
        .into());
    }
    check_root(adjacency.num_nodes(), root)?;

    let traversal = traverse(adjacency, comm, &Weighted { root: root.0 }, config);
    if traversal.exhausted {
        tracing::warn!(
            root = root.0,
            rounds = traversal.rounds.len(),
            "negative cycle reachable from root; distances are unreliable"
        );
    }

    Ok(ShortestPaths {
        distances: traversal.values,
        negative_cycle: traversal.exhausted,
        rounds: traversal.rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DirectionPolicy;

    #[test]
    fn test_path_weight_five() {
        let graph = CsrGraph::from_weighted_edges(4, &[(0, 1, 5), (1, 2, 5), (2, 3, 5)]).unwrap();
        let paths = bellman_ford(&graph, NodeId(0)).unwrap();
        assert_eq!(paths.distances, vec![0, 5, 10, 15]);
        assert!(!paths.negative_cycle);
    }

    #[test]
    fn test_cheaper_longer_route_wins() {
        // Direct 0 -> 3 costs 10; 0 -> 1 -> 2 -> 3 costs 3
        let graph =
            CsrGraph::from_weighted_edges(4, &[(0, 3, 10), (0, 1, 1), (1, 2, 1), (2, 3, 1)])
                .unwrap();
        for policy in [DirectionPolicy::AlwaysSparse, DirectionPolicy::AlwaysDense] {
            let config = EngineConfig::default().with_policy(policy);
            let paths = bellman_ford_with_config(&graph, NodeId(0), config).unwrap();
            assert_eq!(paths.distances, vec![0, 1, 2, 3], "{policy:?}");
        }
    }

    #[test]
    fn test_negative_edges_without_cycle() {
        let graph =
            CsrGraph::from_weighted_edges(3, &[(0, 1, 2), (0, 2, 1), (1, 2, -3)]).unwrap();
        let paths = bellman_ford(&graph, NodeId(0)).unwrap();
        assert_eq!(paths.distances, vec![0, 2, -1]);
        assert!(!paths.negative_cycle);
    }

    #[test]
    fn test_negative_cycle_reported() {
        // 1 -> 2 -> 1 sums to -1
        let graph =
            CsrGraph::from_weighted_edges(3, &[(0, 1, 1), (1, 2, 1), (2, 1, -2)]).unwrap();
        let paths = bellman_ford(&graph, NodeId(0)).unwrap();
        assert!(paths.negative_cycle);
        assert_eq!(paths.rounds.len(), 3);
    }

    #[test]
    fn test_unreachable_negative_cycle_ignored() {
        // Cycle between 2 and 3 is not reachable from 0
        let graph =
            CsrGraph::from_weighted_edges(4, &[(0, 1, 1), (2, 3, -1), (3, 2, -1)]).unwrap();
        let paths = bellman_ford(&graph, NodeId(0)).unwrap();
        assert!(!paths.negative_cycle);
        assert_eq!(paths.distance(NodeId(2)), None);
    }

    #[test]
    fn test_unweighted_graph_rejected() {
        let graph = CsrGraph::from_edges(2, &[(0, 1)]).unwrap();
        let err = bellman_ford(&graph, NodeId(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::MissingWeights { .. })
        ));
    }
}
