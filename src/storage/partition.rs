//! Contiguous vertex partitioning and rank-local adjacency
//!
//! Rank `r` of `R` owns `[n/R * r, n/R * (r + 1))`; the last rank also takes
//! the remainder up to `n`. A [`GraphSlice`] holds only the out- and
//! in-adjacency of its owned vertices, with global vertex ids as neighbors.

use super::csr::{AdjacencyBlock, CsrGraph, VertexId};
use super::text::{read_block, Layout, TextFormat, Tokens};
use super::{Adjacency, EdgeView};
use crate::error::GraphError;
use anyhow::Result;
use std::ops::Range;

/// Static block partition of `num_nodes` vertices over `ranks` ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    rank: usize,
    ranks: usize,
    num_nodes: usize,
}

impl Partition {
    /// Partition seen from `rank`
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidPartition`] if `ranks == 0` or
    /// `rank >= ranks`.
    pub fn new(rank: usize, ranks: usize, num_nodes: usize) -> Result<Self, GraphError> {
        if ranks == 0 || rank >= ranks {
            return Err(GraphError::InvalidPartition {
                rank,
                ranks,
                num_nodes,
            });
        }
        Ok(Self {
            rank,
            ranks,
            num_nodes,
        })
    }

    /// This rank
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Total ranks
    #[must_use]
    pub const fn ranks(&self) -> usize {
        self.ranks
    }

    /// Vertices in the whole graph
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Vertices owned by `rank`
    ///
    /// # Panics
    ///
    /// Panics if `rank >= ranks`.
    #[must_use]
    pub fn range_of(&self, rank: usize) -> Range<usize> {
        assert!(rank < self.ranks, "rank {rank} out of {}", self.ranks);
        let chunk = self.num_nodes / self.ranks;
        let start = chunk * rank;
        let end = if rank + 1 == self.ranks {
            self.num_nodes
        } else {
            chunk * (rank + 1)
        };
        start..end
    }

    /// Vertices owned by this rank
    #[must_use]
    pub fn owned(&self) -> Range<usize> {
        self.range_of(self.rank)
    }

    /// Rank owning vertex `v`
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_nodes`.
    #[must_use]
    pub fn owner_of(&self, v: VertexId) -> usize {
        let v = v as usize;
        assert!(
            v < self.num_nodes,
            "vertex {v} out of range (num_nodes = {})",
            self.num_nodes
        );
        let chunk = self.num_nodes / self.ranks;
        if chunk == 0 {
            return self.ranks - 1;
        }
        (v / chunk).min(self.ranks - 1)
    }
}

/// Adjacency of one rank's owned vertices
///
/// # Example
///
/// ```
/// use frontier_graph::{CsrGraph, GraphSlice, Partition};
///
/// let graph = CsrGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
/// let slice = GraphSlice::from_graph(&graph, Partition::new(1, 2, 4).unwrap());
///
/// assert_eq!(slice.owned(), 2..4);
/// assert_eq!(slice.out_neighbors(3), &[0]);
/// ```
#[derive(Debug, Clone)]
pub struct GraphSlice {
    partition: Partition,
    out: AdjacencyBlock,
    inc: AdjacencyBlock,
    weighted: bool,
}

impl GraphSlice {
    /// Copy the owned part of a full graph
    #[must_use]
    pub fn from_graph(graph: &CsrGraph, partition: Partition) -> Self {
        let owned = partition.owned();
        Self {
            partition,
            out: sub_block(graph.out_adjacency(), &owned),
            inc: sub_block(graph.in_adjacency(), &owned),
            weighted: graph.is_weighted(),
        }
    }

    /// Parse only this rank's slice of a graph file
    ///
    /// Every token is still validated; adjacency outside the owned range is
    /// discarded as it streams past.
    ///
    /// # Errors
    ///
    /// Returns error if the text is malformed, or [`GraphError::InvalidPartition`]
    /// for a bad rank layout.
    pub fn parse_text(text: &str, format: TextFormat, rank: usize, ranks: usize) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let header = tokens.header()?;
        let partition = Partition::new(rank, ranks, header.num_nodes)?;
        let owned = partition.owned();

        let (out, inc) = match format.layout {
            Layout::Dual => {
                let out = read_block(&mut tokens, header, format.weighted, &owned, None)?;
                let inc = read_block(&mut tokens, header, format.weighted, &owned, None)?;
                (out, inc)
            }
            Layout::OutOnly => {
                let mut reversed = Vec::new();
                let out =
                    read_block(&mut tokens, header, format.weighted, &owned, Some(&mut reversed))?;
                let inc = AdjacencyBlock::from_grouped(owned.len(), &reversed, format.weighted);
                (out, inc)
            }
        };
        tokens.finish()?;

        tracing::debug!(
            rank,
            ranks,
            owned = ?owned,
            out_edges = out.num_edges(),
            in_edges = inc.num_edges(),
            "graph slice loaded"
        );
        Ok(Self {
            partition,
            out,
            inc,
            weighted: format.weighted,
        })
    }

    /// Partition this slice belongs to
    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Owned vertex range
    #[must_use]
    pub fn owned(&self) -> Range<usize> {
        self.partition.owned()
    }

    fn local(&self, v: VertexId) -> usize {
        let owned = self.owned();
        assert!(
            owned.contains(&(v as usize)),
            "vertex {v} not owned by rank {} ({owned:?})",
            self.partition.rank
        );
        v as usize - owned.start
    }

    /// Out-degree of owned vertex `v`
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    #[must_use]
    pub fn out_degree(&self, v: VertexId) -> usize {
        self.out.edge_range(self.local(v)).len()
    }

    /// In-degree of owned vertex `v`
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    #[must_use]
    pub fn in_degree(&self, v: VertexId) -> usize {
        self.inc.edge_range(self.local(v)).len()
    }

    /// Outgoing neighbors of owned vertex `v`
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    #[must_use]
    pub fn out_neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.out.targets[self.out.edge_range(self.local(v))]
    }

    /// Incoming neighbors of owned vertex `v`
    ///
    /// # Panics
    ///
    /// Panics if `v` is not owned.
    #[must_use]
    pub fn in_neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.inc.targets[self.inc.edge_range(self.local(v))]
    }

    fn view(block: &AdjacencyBlock, local: usize) -> EdgeView<'_> {
        let range = block.edge_range(local);
        EdgeView {
            targets: &block.targets[range.clone()],
            weights: block.weights.as_deref().map(|w| &w[range]),
        }
    }
}

impl Adjacency for GraphSlice {
    fn num_nodes(&self) -> usize {
        self.partition.num_nodes
    }

    fn owned_range(&self) -> Range<usize> {
        self.owned()
    }

    fn out_edges(&self, v: VertexId) -> EdgeView<'_> {
        Self::view(&self.out, self.local(v))
    }

    fn in_edges(&self, v: VertexId) -> EdgeView<'_> {
        Self::view(&self.inc, self.local(v))
    }

    fn is_weighted(&self) -> bool {
        self.weighted
    }
}

/// Rebased copy of the rows in `owned`
fn sub_block(block: &AdjacencyBlock, owned: &Range<usize>) -> AdjacencyBlock {
    let total = block.num_edges();
    let start = block.offsets.get(owned.start).map_or(total, |&o| o as usize);
    let end = block.offsets.get(owned.end).map_or(total, |&o| o as usize);
    #[allow(clippy::cast_possible_truncation)] // Graphs >4B edges not supported yet
    let base = start as u32;

    AdjacencyBlock {
        offsets: block.offsets[owned.clone()].iter().map(|&o| o - base).collect(),
        targets: block.targets[start..end].to_vec(),
        weights: block.weights.as_ref().map(|w| w[start..end].to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: u32) -> CsrGraph {
        let edges: Vec<_> = (0..n).map(|v| (v, (v + 1) % n)).collect();
        CsrGraph::from_edges(n as usize, &edges).unwrap()
    }

    #[test]
    fn test_ranges_cover_all_vertices() {
        let p = Partition::new(0, 3, 10).unwrap();
        assert_eq!(p.range_of(0), 0..3);
        assert_eq!(p.range_of(1), 3..6);
        assert_eq!(p.range_of(2), 6..10);
    }

    #[test]
    fn test_owner_of_matches_ranges() {
        let p = Partition::new(0, 3, 10).unwrap();
        for v in 0..10_u32 {
            let owner = p.owner_of(v);
            assert!(p.range_of(owner).contains(&(v as usize)), "vertex {v}");
        }
    }

    #[test]
    fn test_more_ranks_than_vertices() {
        let p = Partition::new(0, 4, 2).unwrap();
        assert!(p.range_of(0).is_empty());
        assert_eq!(p.range_of(3), 0..2);
        assert_eq!(p.owner_of(1), 3);
    }

    #[test]
    fn test_invalid_partition() {
        assert!(Partition::new(2, 2, 10).is_err());
        assert!(Partition::new(0, 0, 10).is_err());
    }

    #[test]
    fn test_slice_from_graph() {
        let graph = cycle(6);
        let slice = GraphSlice::from_graph(&graph, Partition::new(1, 2, 6).unwrap());
        assert_eq!(slice.owned(), 3..6);
        assert_eq!(slice.out_neighbors(5), &[0]);
        assert_eq!(slice.in_neighbors(3), &[2]);
        assert_eq!(slice.out_degree(4), 1);
    }

    #[test]
    #[should_panic(expected = "not owned")]
    fn test_slice_rejects_foreign_vertex() {
        let graph = cycle(6);
        let slice = GraphSlice::from_graph(&graph, Partition::new(1, 2, 6).unwrap());
        let _ = slice.out_neighbors(0);
    }

    #[test]
    fn test_parse_slice_matches_from_graph() {
        // 0 -> 1, 0 -> 3, 1 -> 2, 3 -> 2
        let text = "4 4\n0 2 3 3\n1 3 2 2";
        let format = TextFormat::new().with_layout(Layout::OutOnly);
        let graph = CsrGraph::parse_text(text, format).unwrap();

        for rank in 0..2 {
            let parsed = GraphSlice::parse_text(text, format, rank, 2).unwrap();
            let copied = GraphSlice::from_graph(&graph, Partition::new(rank, 2, 4).unwrap());
            for v in parsed.owned() {
                #[allow(clippy::cast_possible_truncation)]
                let v = v as u32;
                assert_eq!(parsed.out_neighbors(v), copied.out_neighbors(v));
                assert_eq!(parsed.in_neighbors(v), copied.in_neighbors(v));
            }
        }
    }

    #[test]
    fn test_parse_slice_still_validates_foreign_edges() {
        let format = TextFormat::new().with_layout(Layout::OutOnly);
        // Vertex 0 (rank 0) points at 9
        let err = GraphSlice::parse_text("2 1\n0 1\n9", format, 1, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::VertexOutOfRange { vertex: 9, .. })
        ));
    }
}
