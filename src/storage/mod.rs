//! Graph storage layer
//!
//! Provides the dual CSR graph, its text-format loaders, and the rank-local
//! slices used by partitioned execution. Algorithms see both through the
//! [`Adjacency`] trait.

pub mod csr;
pub mod partition;
pub mod text;

pub use csr::{AdjacencyBlock, CsrGraph, EdgeId, NodeId, VertexId, Weight};
pub use partition::{GraphSlice, Partition};
pub use text::{Layout, TextFormat};

use std::ops::Range;

/// Neighbors of one vertex in one direction, with their weights
///
/// Unweighted graphs report weight 1 for every edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    /// Neighbor ids
    pub targets: &'a [VertexId],
    /// Parallel weights, if the graph carries them
    pub weights: Option<&'a [Weight]>,
}

impl<'a> EdgeView<'a> {
    /// Number of edges in the view
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the vertex has no edges in this direction
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `(neighbor, weight)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Weight)> + 'a {
        let weights = self.weights;
        self.targets
            .iter()
            .enumerate()
            .map(move |(i, &t)| (t, weights.map_or(1, |w| w[i])))
    }
}

/// Read-only adjacency over a (possibly partial) vertex range
///
/// Implemented by the full [`CsrGraph`] (owns every vertex) and by a rank's
/// [`GraphSlice`] (owns one contiguous range). Vertex ids are always global.
pub trait Adjacency: Sync {
    /// Vertices in the whole graph
    fn num_nodes(&self) -> usize;

    /// Vertices whose adjacency this instance holds
    fn owned_range(&self) -> Range<usize>;

    /// Outgoing edges of an owned vertex
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    fn out_edges(&self, v: VertexId) -> EdgeView<'_>;

    /// Incoming edges of an owned vertex
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    fn in_edges(&self, v: VertexId) -> EdgeView<'_>;

    /// Whether edges carry weights
    fn is_weighted(&self) -> bool;

    /// Whether `v` falls in [`owned_range`](Self::owned_range)
    fn owns(&self, v: VertexId) -> bool {
        self.owned_range().contains(&(v as usize))
    }
}

impl Adjacency for CsrGraph {
    fn num_nodes(&self) -> usize {
        CsrGraph::num_nodes(self)
    }

    fn owned_range(&self) -> Range<usize> {
        0..CsrGraph::num_nodes(self)
    }

    fn out_edges(&self, v: VertexId) -> EdgeView<'_> {
        EdgeView {
            targets: self.out_neighbors(v),
            weights: CsrGraph::out_weights(self, v),
        }
    }

    fn in_edges(&self, v: VertexId) -> EdgeView<'_> {
        EdgeView {
            targets: self.in_neighbors(v),
            weights: CsrGraph::in_weights(self, v),
        }
    }

    fn is_weighted(&self) -> bool {
        CsrGraph::is_weighted(self)
    }
}
