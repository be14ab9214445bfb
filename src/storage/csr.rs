//! CSR (Compressed Sparse Row) graph representation
//!
//! Dual-direction layout after Ligra (Shun & Blelloch, `PPoPP` 2013): the
//! out-adjacency drives sparse (push) rounds, the in-adjacency drives dense
//! (pull) rounds.
//!
//! # CSR Format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! Out-CSR:
//!   offsets: [0, 2, 3]    // Node 0: edges [0..2), Node 1: [2..3), Node 2: [3..m)
//!   targets: [1, 2, 2]
//!
//! In-CSR:
//!   offsets: [0, 0, 1]    // Node 0: none, Node 1: [0..1), Node 2: [1..m)
//!   targets: [0, 0, 1]
//! ```
//!
//! Offsets hold one entry per vertex, as in the on-disk format; the range of
//! the last vertex ends at the total edge count.

use crate::error::GraphError;
use crate::parallel::plus_scan;
use anyhow::Result;
use rayon::prelude::*;
use std::ops::Range;

/// Dense vertex index into CSR arrays
pub type VertexId = u32;

/// Index into the flat edge arrays
pub type EdgeId = u32;

/// Integer edge weight (may be negative)
pub type Weight = i64;

/// Node identifier (zero-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// One direction of adjacency in CSR form
///
/// `weights`, when present, is parallel to `targets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyBlock {
    /// Start of each vertex's edge range (length = vertices covered)
    pub offsets: Vec<EdgeId>,
    /// Neighbor of each edge
    pub targets: Vec<VertexId>,
    /// Weight of each edge
    pub weights: Option<Vec<Weight>>,
}

impl AdjacencyBlock {
    /// Edge range of the `local`-th vertex covered by this block
    ///
    /// # Panics
    ///
    /// Panics if `local` is not covered by the block.
    #[inline]
    #[must_use]
    pub fn edge_range(&self, local: usize) -> Range<usize> {
        assert!(
            local < self.offsets.len(),
            "vertex {local} out of range (block covers {})",
            self.offsets.len()
        );
        let start = self.offsets[local] as usize;
        let end = self
            .offsets
            .get(local + 1)
            .map_or(self.targets.len(), |&o| o as usize);
        start..end
    }

    /// Number of edges in the block
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.targets.len()
    }

    /// Build a block for `num_vertices` vertices from `(local_vertex, neighbor, weight)`
    ///
    /// Counting sort: stable, so neighbors keep input order within a vertex.
    pub(crate) fn from_grouped(
        num_vertices: usize,
        edges: &[(usize, VertexId, Weight)],
        weighted: bool,
    ) -> Self {
        let mut degrees = vec![0_usize; num_vertices];
        for &(v, _, _) in edges {
            degrees[v] += 1;
        }
        let (starts, _) = plus_scan(&degrees);

        let mut cursor = starts.clone();
        let mut targets = vec![0; edges.len()];
        let mut weights = vec![0; if weighted { edges.len() } else { 0 }];
        for &(v, neighbor, weight) in edges {
            let slot = cursor[v];
            targets[slot] = neighbor;
            if weighted {
                weights[slot] = weight;
            }
            cursor[v] += 1;
        }

        #[allow(clippy::cast_possible_truncation)] // Graphs >4B edges not supported yet
        let offsets = starts.into_iter().map(|s| s as EdgeId).collect();

        Self {
            offsets,
            targets,
            weights: weighted.then_some(weights),
        }
    }

    /// Check offsets/targets against a vertex space of `num_nodes`
    pub(crate) fn validate(&self, num_nodes: usize) -> Result<(), GraphError> {
        let num_edges = self.targets.len();
        if let Some(weights) = &self.weights {
            if weights.len() != num_edges {
                return Err(GraphError::InvalidHeader(format!(
                    "{} weights for {num_edges} edges",
                    weights.len()
                )));
            }
        }
        validate_offsets(&self.offsets, num_edges)?;
        if let Some(&bad) = self.targets.iter().find(|&&t| t as usize >= num_nodes) {
            return Err(GraphError::VertexOutOfRange {
                vertex: u64::from(bad),
                num_nodes,
            });
        }
        Ok(())
    }
}

/// CSR (Compressed Sparse Row) graph
///
/// Immutable after construction. Optimized for:
/// - O(1) access to outgoing edges (via forward CSR)
/// - O(1) access to incoming edges (via reverse CSR)
/// - Parallel sweeps over either direction
///
/// # Example
///
/// ```
/// use frontier_graph::CsrGraph;
///
/// let graph = CsrGraph::from_edges(3, &[(0, 1), (0, 2), (1, 2)]).unwrap();
///
/// assert_eq!(graph.out_neighbors(0), &[1, 2]);
/// assert_eq!(graph.in_degree(2), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CsrGraph {
    /// Forward CSR (outgoing edges)
    out: AdjacencyBlock,

    /// Reverse CSR (incoming edges)
    inc: AdjacencyBlock,

    /// Number of nodes
    num_nodes: usize,
}

impl CsrGraph {
    /// Create new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: AdjacencyBlock::default(),
            inc: AdjacencyBlock::default(),
            num_nodes: 0,
        }
    }

    /// Create weighted graph from edge list
    ///
    /// The vertex count is one past the largest endpoint.
    ///
    /// # Arguments
    ///
    /// * `edges` - List of (source, target, weight) tuples
    ///
    /// # Errors
    ///
    /// Returns error if the vertex count does not fit the id width.
    pub fn from_edge_list(edges: &[(NodeId, NodeId, Weight)]) -> Result<Self> {
        let num_nodes = edges
            .iter()
            .flat_map(|(src, dst, _)| [src.0, dst.0])
            .max()
            .map_or(0, |max| max as usize + 1);

        let triples: Vec<_> = edges.iter().map(|(s, d, w)| (s.0, d.0, *w)).collect();
        Self::from_weighted_edges(num_nodes, &triples)
    }

    /// Create unweighted graph with `num_nodes` vertices
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::VertexOutOfRange`] if an endpoint is `>= num_nodes`.
    pub fn from_edges(num_nodes: usize, edges: &[(VertexId, VertexId)]) -> Result<Self> {
        let triples: Vec<_> = edges.iter().map(|&(s, d)| (s, d, 1)).collect();
        Self::build(num_nodes, &triples, false)
    }

    /// Create weighted graph with `num_nodes` vertices
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::VertexOutOfRange`] if an endpoint is `>= num_nodes`.
    pub fn from_weighted_edges(
        num_nodes: usize,
        edges: &[(VertexId, VertexId, Weight)],
    ) -> Result<Self> {
        Self::build(num_nodes, edges, true)
    }

    fn build(num_nodes: usize, edges: &[(VertexId, VertexId, Weight)], weighted: bool) -> Result<Self> {
        check_id_width(num_nodes, edges.len())?;
        if let Some(&(s, d, _)) = edges
            .iter()
            .find(|&&(s, d, _)| s as usize >= num_nodes || d as usize >= num_nodes)
        {
            return Err(GraphError::VertexOutOfRange {
                vertex: u64::from(s.max(d)),
                num_nodes,
            }
            .into());
        }

        let forward: Vec<_> = edges.iter().map(|&(s, d, w)| (s as usize, d, w)).collect();
        let out = AdjacencyBlock::from_grouped(num_nodes, &forward, weighted);
        let inc = invert(num_nodes, &out);

        Ok(Self {
            out,
            inc,
            num_nodes,
        })
    }

    /// Create graph from an out-adjacency block, deriving the in-adjacency
    ///
    /// # Errors
    ///
    /// Returns error if the block violates a CSR invariant.
    pub fn from_out_adjacency(num_nodes: usize, out: AdjacencyBlock) -> Result<Self> {
        check_block_shape(num_nodes, &out)?;
        out.validate(num_nodes)?;
        let inc = invert(num_nodes, &out);
        Ok(Self {
            out,
            inc,
            num_nodes,
        })
    }

    /// Create graph from explicit out- and in-adjacency blocks
    ///
    /// # Errors
    ///
    /// Returns error if either block violates a CSR invariant or the two
    /// directions disagree about any edge.
    pub fn from_dual_adjacency(
        num_nodes: usize,
        out: AdjacencyBlock,
        inc: AdjacencyBlock,
    ) -> Result<Self> {
        check_block_shape(num_nodes, &out)?;
        check_block_shape(num_nodes, &inc)?;
        out.validate(num_nodes)?;
        inc.validate(num_nodes)?;
        if out.weights.is_some() != inc.weights.is_some() || out.num_edges() != inc.num_edges() {
            return Err(GraphError::InvalidHeader(
                "out- and in-adjacency blocks differ in shape".to_string(),
            )
            .into());
        }

        let graph = Self {
            out,
            inc,
            num_nodes,
        };
        graph.check_consistency()?;
        Ok(graph)
    }

    /// Get number of nodes
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Get number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.out.num_edges()
    }

    /// Whether edges carry weights
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        self.out.weights.is_some()
    }

    /// Out-degree of `v`
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn out_degree(&self, v: VertexId) -> usize {
        self.out.edge_range(v as usize).len()
    }

    /// In-degree of `v`
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn in_degree(&self, v: VertexId) -> usize {
        self.inc.edge_range(v as usize).len()
    }

    /// Outgoing neighbors of `v` (view into the edge array)
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn out_neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.out.targets[self.out.edge_range(v as usize)]
    }

    /// Incoming neighbors of `v` (view into the reverse edge array)
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn in_neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.inc.targets[self.inc.edge_range(v as usize)]
    }

    /// Weights parallel to [`out_neighbors`](Self::out_neighbors), if weighted
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn out_weights(&self, v: VertexId) -> Option<&[Weight]> {
        let range = self.out.edge_range(v as usize);
        self.out.weights.as_deref().map(|w| &w[range])
    }

    /// Weights parallel to [`in_neighbors`](Self::in_neighbors), if weighted
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[inline]
    #[must_use]
    pub fn in_weights(&self, v: VertexId) -> Option<&[Weight]> {
        let range = self.inc.edge_range(v as usize);
        self.inc.weights.as_deref().map(|w| &w[range])
    }

    /// Forward CSR block
    #[must_use]
    pub fn out_adjacency(&self) -> &AdjacencyBlock {
        &self.out
    }

    /// Reverse CSR block
    #[must_use]
    pub fn in_adjacency(&self) -> &AdjacencyBlock {
        &self.inc
    }

    /// Every out edge has a matching in edge and vice versa
    ///
    /// Multi-edges must match in multiplicity, weights included.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.check_consistency().is_ok()
    }

    fn check_consistency(&self) -> Result<(), GraphError> {
        let mut forward = edge_triples(&self.out, false);
        let mut backward = edge_triples(&self.inc, true);
        forward.par_sort_unstable();
        backward.par_sort_unstable();

        if let Some((f, b)) = forward.iter().zip(&backward).find(|(f, b)| f != b) {
            let (tail, head, _) = (*f).min(*b);
            return Err(GraphError::InconsistentAdjacency { tail, head });
        }
        if forward.len() != backward.len() {
            let (tail, head, _) = forward
                .get(backward.len())
                .or_else(|| backward.get(forward.len()))
                .copied()
                .unwrap_or_default();
            return Err(GraphError::InconsistentAdjacency { tail, head });
        }
        Ok(())
    }
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// `(tail, head, weight)` for every edge of a block; `reversed` for in-blocks
fn edge_triples(block: &AdjacencyBlock, reversed: bool) -> Vec<(VertexId, VertexId, Weight)> {
    (0..block.offsets.len())
        .into_par_iter()
        .flat_map_iter(|v| {
            let range = block.edge_range(v);
            #[allow(clippy::cast_possible_truncation)]
            let v = v as VertexId;
            range.map(move |e| {
                let w = block.weights.as_ref().map_or(1, |w| w[e]);
                let u = block.targets[e];
                if reversed {
                    (u, v, w)
                } else {
                    (v, u, w)
                }
            })
        })
        .collect()
}

/// Reverse an out-adjacency block (sources ascending within each in-list)
fn invert(num_nodes: usize, out: &AdjacencyBlock) -> AdjacencyBlock {
    let weighted = out.weights.is_some();
    let reversed: Vec<_> = (0..out.offsets.len())
        .flat_map(|u| {
            out.edge_range(u).map(move |e| {
                #[allow(clippy::cast_possible_truncation)]
                let u = u as VertexId;
                let w = out.weights.as_ref().map_or(1, |w| w[e]);
                (out.targets[e] as usize, u, w)
            })
        })
        .collect();
    AdjacencyBlock::from_grouped(num_nodes, &reversed, weighted)
}

/// Offsets start at 0, never decrease, and stay within `num_edges`
pub(crate) fn validate_offsets(offsets: &[EdgeId], num_edges: usize) -> Result<(), GraphError> {
    if let Some(&first) = offsets.first() {
        if first != 0 {
            return Err(GraphError::InvalidOffsets {
                vertex: 0,
                reason: format!("first offset is {first}, expected 0"),
            });
        }
    }
    for (vertex, pair) in offsets.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(GraphError::InvalidOffsets {
                vertex: vertex + 1,
                reason: format!("offset {} decreases from {}", pair[1], pair[0]),
            });
        }
    }
    if let Some(&last) = offsets.last() {
        if last as usize > num_edges {
            return Err(GraphError::InvalidOffsets {
                vertex: offsets.len() - 1,
                reason: format!("offset {last} exceeds edge count {num_edges}"),
            });
        }
    }
    Ok(())
}

fn check_block_shape(num_nodes: usize, block: &AdjacencyBlock) -> Result<(), GraphError> {
    check_id_width(num_nodes, block.num_edges())?;
    if block.offsets.len() != num_nodes {
        return Err(GraphError::InvalidHeader(format!(
            "{} offsets for {num_nodes} vertices",
            block.offsets.len()
        )));
    }
    Ok(())
}

fn check_id_width(num_nodes: usize, num_edges: usize) -> Result<(), GraphError> {
    if num_nodes > VertexId::MAX as usize || num_edges > EdgeId::MAX as usize {
        return Err(GraphError::InvalidHeader(format!(
            "{num_nodes} vertices / {num_edges} edges exceed 32-bit ids"
        )));
    }
    Ok(())
}
