//! Typed failure kinds
//!
//! Public functions return [`anyhow::Result`]; the variants below travel inside
//! the `anyhow::Error` and can be recovered with `downcast_ref::<GraphError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Graph loading and algorithm input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Graph file does not exist
    #[error("Graph file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input ended before a required value was read
    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A token could not be parsed as a number
    #[error("Invalid token {token:?} at position {position}")]
    InvalidToken {
        /// Zero-based token index in the input
        position: usize,
        /// Offending token text
        token: String,
    },

    /// Header counts do not fit the supported id width
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Offsets array is not a valid CSR offsets sequence
    #[error("Invalid offset for vertex {vertex}: {reason}")]
    InvalidOffsets {
        /// Vertex whose offset is broken
        vertex: usize,
        /// Human-readable reason
        reason: String,
    },

    /// A vertex id is outside `[0, num_nodes)`
    #[error("Vertex {vertex} out of range (num_nodes = {num_nodes})")]
    VertexOutOfRange {
        /// Offending vertex id
        vertex: u64,
        /// Number of vertices in the graph
        num_nodes: usize,
    },

    /// Out- and in-adjacency disagree about an edge
    #[error("Inconsistent adjacency: edge {tail} -> {head} missing from one direction")]
    InconsistentAdjacency {
        /// Edge tail (source vertex)
        tail: u32,
        /// Edge head (target vertex)
        head: u32,
    },

    /// Extra tokens after the last expected block
    #[error("Trailing data at token {position}")]
    TrailingData {
        /// Index of the first unexpected token
        position: usize,
    },

    /// Weighted algorithm invoked on an unweighted graph
    #[error("{algorithm} requires edge weights")]
    MissingWeights {
        /// Algorithm name
        algorithm: &'static str,
    },

    /// Rank layout cannot cover the vertex space
    #[error("Invalid partition: rank {rank} of {ranks} over {num_nodes} vertices")]
    InvalidPartition {
        /// Requested rank
        rank: usize,
        /// Total ranks
        ranks: usize,
        /// Number of vertices
        num_nodes: usize,
    },
}
