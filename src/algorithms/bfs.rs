//! Breadth-first search
//!
//! Level-synchronous BFS on the direction-optimizing engine (Beamer et al.,
//! SC 2012): small frontiers push along out-edges, large frontiers pull along
//! in-edges, and a vertex's distance is set exactly once.

use super::check_root;
use crate::comm::{Communicator, LocalComm};
use crate::engine::{traverse, EngineConfig, Relax, RoundStats, INFINITY};
use crate::storage::{Adjacency, CsrGraph, NodeId, VertexId, Weight};
use anyhow::Result;

/// Result of a BFS
#[derive(Debug, Clone)]
pub struct BfsResult {
    /// Hop count from the root; [`INFINITY`] if unreachable
    pub distances: Vec<i64>,
    /// Per-round trace
    pub rounds: Vec<RoundStats>,
}

impl BfsResult {
    /// Distance to `node`, or `None` if unreachable
    #[must_use]
    pub fn distance(&self, node: NodeId) -> Option<i64> {
        self.distances
            .get(node.0 as usize)
            .copied()
            .filter(|&d| d != INFINITY)
    }

    /// Every vertex reached from the root, ascending
    #[must_use]
    pub fn reachable(&self) -> Vec<VertexId> {
        #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
        let reached = self
            .distances
            .iter()
            .enumerate()
            .filter(|(_, &d)| d != INFINITY)
            .map(|(v, _)| v as VertexId)
            .collect();
        reached
    }
}

/// Unit-step relaxation: one offer per level, taken by the first claimant
struct Hops {
    root: VertexId,
}

impl Relax for Hops {
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

    fn propagate(&self, value: i64, _weight: Weight) -> Option<i64> {
        (value != INFINITY).then(|| value + 1)
    }

    fn settled(&self, value: i64) -> bool {
        value != INFINITY
    }

    fn first_offer_wins(&self) -> bool {
        true
    }
}

/// Breadth-First Search from `root`
///
/// # Errors
///
/// Returns [`GraphError::VertexOutOfRange`](crate::GraphError::VertexOutOfRange)
/// if `root` is not a vertex of `graph`.
///
/// # Example
///
/// ```
/// use frontier_graph::{bfs, CsrGraph, NodeId};
///
/// let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
///
/// let result = bfs(&graph, NodeId(0)).unwrap();
/// assert_eq!(result.distances, vec![0, 1, 2]);
/// assert_eq!(result.distance(NodeId(2)), Some(2));
/// ```
pub fn bfs(graph: &CsrGraph, root: NodeId) -> Result<BfsResult> {
    bfs_with_config(graph, root, EngineConfig::default())
}

/// BFS with an explicit engine configuration
///
/// # Errors
///
/// Returns [`GraphError::VertexOutOfRange`](crate::GraphError::VertexOutOfRange)
/// if `root` is not a vertex of `graph`.
pub fn bfs_with_config(graph: &CsrGraph, root: NodeId, config: EngineConfig) -> Result<BfsResult> {
    bfs_on(graph, &LocalComm, root, config)
}

/// BFS over any adjacency and communicator (one call per rank)
///
/// # Errors
///
/// Returns [`GraphError::VertexOutOfRange`](crate::GraphError::VertexOutOfRange)
/// if `root` is not a vertex of the graph.
pub fn bfs_on<A, C>(adjacency: &A, comm: &C, root: NodeId, config: EngineConfig) -> Result<BfsResult>
where
    A: Adjacency,
    C: Communicator,
{
    check_root(adjacency.num_nodes(), root)?;
    let traversal = traverse(adjacency, comm, &Hops { root: root.0 }, config);
    Ok(BfsResult {
        distances: traversal.values,
        rounds: traversal.rounds,
    })
}
