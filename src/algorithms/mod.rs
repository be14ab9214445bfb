//! Graph algorithms (BFS, Bellman-Ford, connected components, `PageRank`)
//!
//! The first three run on the direction-optimizing engine; `PageRank` is a
//! plain dense power iteration. Every algorithm has three entry points: a
//! default one on a [`CsrGraph`](crate::CsrGraph), a `_with_config` variant,
//! and an `_on` variant taking any [`Adjacency`](crate::storage::Adjacency)
//! and [`Communicator`](crate::comm::Communicator) for partitioned runs.

pub mod bellman_ford;
pub mod bfs;
pub mod components;
pub mod pagerank;
pub mod verify;

pub use bellman_ford::{bellman_ford, bellman_ford_on, bellman_ford_with_config, ShortestPaths};
pub use bfs::{bfs, bfs_on, bfs_with_config, BfsResult};
pub use components::{
    connected_components, connected_components_on, connected_components_with_config, Components,
};
pub use pagerank::{
    pagerank, pagerank_on, pagerank_with_config, DanglingPolicy, PageRank, PageRankConfig,
    DAMPING_FACTOR,
};

use crate::error::GraphError;
use crate::storage::NodeId;

/// Roots are caller input, so a bad one is an error rather than a panic
fn check_root(num_nodes: usize, root: NodeId) -> Result<(), GraphError> {
    if root.0 as usize >= num_nodes {
        return Err(GraphError::VertexOutOfRange {
            vertex: u64::from(root.0),
            num_nodes,
        });
    }
    Ok(())
}
