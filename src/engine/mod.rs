//! Direction-optimizing traversal engine
//!
//! Based on Beamer et al. (SC 2012) direction optimization and the Ligra
//! `edgeMap` abstraction (Shun & Blelloch, `PPoPP` 2013). One engine serves
//! BFS, Bellman-Ford and connected components; each supplies a [`Relax`]
//! strategy describing how a value travels along an edge.
//!
//! # Rounds
//!
//! Each round reads the `current` values and frontier and writes a `next`
//! copy, which is swapped in when the round ends:
//!
//! - **Sparse** (push): every frontier vertex offers a value to its
//!   out-neighbors through an atomic priority update. Work is proportional to
//!   the edges leaving the frontier.
//! - **Dense** (pull): every owned vertex scans its in-neighbors for frontier
//!   members with a better offer. Each vertex writes only its own cell, so no
//!   atomics are needed.
//!
//! The frontier is sparse when it holds fewer than `num_nodes / threshold_denom`
//! vertices.
//!
//! # Ranks
//!
//! With more than one rank, every rank keeps a full replica of the values and
//! the frontier, processes only the frontier vertices (sparse) or targets
//! (dense) it owns, then reconciles: sparse rounds all-reduce values by
//! minimum and frontier flags by or; dense rounds all-gather each rank's
//! owned window.

mod rounds;

use crate::comm::Communicator;
use crate::frontier::Frontier;
use crate::storage::{Adjacency, VertexId, Weight};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Value of an unreached vertex
pub const INFINITY: i64 = i64::MAX;

/// Default sparse/dense switch point: sparse below `n / 20` active vertices
pub const DEFAULT_THRESHOLD_DENOM: usize = 20;

/// Per-algorithm relaxation strategy
///
/// Values only ever decrease: the engine keeps the minimum of every offer a
/// vertex receives.
pub trait Relax: Sync {
    /// Value of `v` before the first round
    fn initial_value(&self, v: VertexId) -> i64;

    /// Vertices active in the first round
    fn seeds(&self, num_nodes: usize) -> Vec<VertexId>;

    /// Offer to a neighbor, given the source's value and the edge weight
    ///
    /// `None` means the source has nothing to offer.
    fn propagate(&self, value: i64, weight: Weight) -> Option<i64>;

    /// Also relax against edge direction (undirected semantics)
    fn symmetric(&self) -> bool {
        false
    }

    /// Whether a vertex holding `value` can still improve
    ///
    /// Dense rounds skip vertices that cannot.
    fn settled(&self, _value: i64) -> bool {
        false
    }

    /// Whether the first frontier offer a dense scan finds is already the best
    fn first_offer_wins(&self) -> bool {
        false
    }

    /// Round cap, if the algorithm has one
    fn max_rounds(&self, _num_nodes: usize) -> Option<usize> {
        None
    }
}

/// How round directions are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionPolicy {
    /// Switch by frontier size
    #[default]
    Adaptive,
    /// Every round pushes
    AlwaysSparse,
    /// Every round pulls
    AlwaysDense,
}

/// Round direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Push from frontier vertices along out-edges
    Sparse,
    /// Pull into every owned vertex along in-edges
    Dense,
}

/// Traversal engine configuration
///
/// # Example
///
/// ```
/// use frontier_graph::engine::{DirectionPolicy, EngineConfig};
///
/// let config = EngineConfig::default()
///     .with_policy(DirectionPolicy::AlwaysDense)
///     .with_threshold_denom(10);
/// assert_eq!(config.threshold_denom, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Direction policy
    pub policy: DirectionPolicy,
    /// Sparse while frontier size < `num_nodes / threshold_denom`
    pub threshold_denom: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: DirectionPolicy::Adaptive,
            threshold_denom: DEFAULT_THRESHOLD_DENOM,
        }
    }
}

impl EngineConfig {
    /// Set the direction policy
    #[must_use]
    pub fn with_policy(mut self, policy: DirectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the sparse/dense threshold denominator (clamped to at least 1)
    #[must_use]
    pub fn with_threshold_denom(mut self, denom: usize) -> Self {
        self.threshold_denom = denom.max(1);
        self
    }

    /// Direction for a round starting with `frontier_size` active vertices
    #[must_use]
    pub fn choose(&self, frontier_size: usize, num_nodes: usize) -> Direction {
        match self.policy {
            DirectionPolicy::AlwaysSparse => Direction::Sparse,
            DirectionPolicy::AlwaysDense => Direction::Dense,
            DirectionPolicy::Adaptive => {
                if frontier_size < num_nodes / self.threshold_denom.max(1) {
                    Direction::Sparse
                } else {
                    Direction::Dense
                }
            }
        }
    }
}

/// What happened in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    /// Round index, from 0
    pub level: usize,
    /// Direction taken
    pub direction: Direction,
    /// Active vertices at the start of the round
    pub frontier_size: usize,
    /// Vertices this rank improved
    pub local_updates: usize,
    /// Local compute time
    pub compute: Duration,
    /// Time spent in collectives
    pub sync: Duration,
}

/// Result of a traversal
#[derive(Debug, Clone)]
pub struct Traversal {
    /// Final value per vertex
    pub values: Vec<i64>,
    /// One entry per executed round
    pub rounds: Vec<RoundStats>,
    /// The round cap was hit with vertices still active
    pub exhausted: bool,
}

/// Run a traversal to its fixed point (or round cap)
///
/// `adjacency` may be the full graph or a rank slice; `comm` must span all
/// ranks holding slices of the same graph. Every rank returns the same
/// values.
///
/// # Example
///
/// ```
/// use frontier_graph::comm::LocalComm;
/// use frontier_graph::engine::{traverse, EngineConfig, Relax, INFINITY};
/// use frontier_graph::{CsrGraph, VertexId, Weight};
///
/// struct Hops;
///
/// impl Relax for Hops {
///     fn initial_value(&self, v: VertexId) -> i64 {
///         if v == 0 { 0 } else { INFINITY }
///     }
///     fn seeds(&self, _num_nodes: usize) -> Vec<VertexId> {
///         vec![0]
///     }
///     fn propagate(&self, value: i64, _weight: Weight) -> Option<i64> {
///         (value != INFINITY).then(|| value + 1)
///     }
/// }
///
/// let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
/// let result = traverse(&graph, &LocalComm, &Hops, EngineConfig::default());
/// assert_eq!(result.values, vec![0, 1, 2]);
/// ```
pub fn traverse<A, C, R>(adjacency: &A, comm: &C, relax: &R, config: EngineConfig) -> Traversal
where
    A: Adjacency,
    C: Communicator,
    R: Relax,
{
    let num_nodes = adjacency.num_nodes();
    let round_cap = relax.max_rounds(num_nodes);

    #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
    let mut current: Vec<AtomicI64> = (0..num_nodes)
        .map(|v| AtomicI64::new(relax.initial_value(v as VertexId)))
        .collect();
    let mut next: Vec<AtomicI64> = (0..num_nodes).map(|_| AtomicI64::new(INFINITY)).collect();

    let mut frontier = Frontier::Sparse(relax.seeds(num_nodes));
    let workspace = rounds::Workspace::new(num_nodes);
    let mut stats = Vec::new();
    let mut level = 0;

    while !frontier.is_empty() && round_cap.map_or(true, |cap| level < cap) {
        let frontier_size = frontier.len();
        let direction = config.choose(frontier_size, num_nodes);

        let round = rounds::Round {
            adjacency,
            comm,
            relax,
            current: &current,
            next: &next,
        };
        round.copy_current();

        let (next_frontier, outcome) = match direction {
            Direction::Sparse => round.sparse(&frontier.into_sparse(), &workspace),
            Direction::Dense => round.dense(&frontier.into_dense(num_nodes)),
        };

        let round_stats = RoundStats {
            level,
            direction,
            frontier_size,
            local_updates: outcome.local_updates,
            compute: outcome.compute,
            sync: outcome.sync,
        };
        tracing::debug!(
            rank = comm.rank(),
            level,
            ?direction,
            frontier_size,
            local_updates = outcome.local_updates,
            compute_us = outcome.compute.as_micros(),
            sync_us = outcome.sync.as_micros(),
            "round finished"
        );
        stats.push(round_stats);

        std::mem::swap(&mut current, &mut next);
        frontier = next_frontier;
        level += 1;
    }

    Traversal {
        values: current.into_iter().map(AtomicI64::into_inner).collect(),
        rounds: stats,
        exhausted: !frontier.is_empty(),
    }
}

/// Load every cell
pub(crate) fn snapshot(cells: &[AtomicI64]) -> Vec<i64> {
    use rayon::prelude::*;
    cells.par_iter().map(|c| c.load(Ordering::Relaxed)).collect()
}
