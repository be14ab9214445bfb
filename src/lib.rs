//! frontier-graph: direction-optimizing parallel graph algorithms
//!
//! # Overview
//!
//! frontier-graph runs BFS, Bellman-Ford, connected components and `PageRank`
//! over an immutable dual-direction CSR graph. Traversals switch per round
//! between pushing from a sparse frontier and pulling into every vertex, and
//! the same code runs in one address space or across ranks that each own a
//! slice of the graph.
//!
//! # Quick Start
//!
//! ```
//! use frontier_graph::{bfs, connected_components, CsrGraph, Layout, NodeId, TextFormat};
//!
//! // 4 vertices, 3 edges: 0 -> 1 -> 2 -> 3 (out-adjacency only)
//! let text = "4 3\n0 1 2 3\n1 2 3\n";
//! let format = TextFormat::new().with_layout(Layout::OutOnly);
//! let graph = CsrGraph::parse_text(text, format).unwrap();
//!
//! let result = bfs(&graph, NodeId(0)).unwrap();
//! assert_eq!(result.distances, vec![0, 1, 2, 3]);
//!
//! let components = connected_components(&graph).unwrap();
//! assert_eq!(components.labels, vec![0, 0, 0, 0]);
//! ```
//!
//! # Architecture
//!
//! - **Storage**: dual CSR (out- and in-adjacency), text loaders, rank slices
//! - **Primitives**: blocked scan, stream compaction, atomic priority update
//! - **Engine**: sparse/dense rounds over a pluggable relaxation strategy
//! - **Communication**: collectives between ranks (single rank, or OS-thread ranks)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod comm;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod parallel;
pub mod storage;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export core types
pub use algorithms::{
    bellman_ford, bfs, connected_components, pagerank, BfsResult, Components, DanglingPolicy,
    PageRank, PageRankConfig, ShortestPaths,
};
pub use engine::{DirectionPolicy, EngineConfig, INFINITY};
pub use error::GraphError;
pub use storage::{
    CsrGraph, EdgeId, GraphSlice, Layout, NodeId, Partition, TextFormat, VertexId, Weight,
};

// Error type
pub use anyhow::{Error, Result};
