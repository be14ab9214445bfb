//! `PageRank` by pull-based power iteration
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order to the Web"
//!
//! Every iteration is a full dense sweep: each vertex publishes
//! `score / out_degree`, then each vertex sums the contributions of its
//! in-neighbors. Vertices without out-edges are handled by an explicit
//! [`DanglingPolicy`] instead of dividing by zero.

use crate::comm::{Communicator, LocalComm, ReduceOp};
use crate::storage::{Adjacency, CsrGraph};
use anyhow::{ensure, Result};
use rayon::prelude::*;

/// Damping factor for `PageRank` (Google standard)
pub const DAMPING_FACTOR: f64 = 0.85;

/// What happens to the score of a vertex with no out-edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DanglingPolicy {
    /// Spread it evenly over all vertices; scores keep summing to 1
    #[default]
    Redistribute,
    /// Let it leak; the vertex contributes nothing
    Drop,
}

/// Power-iteration settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRankConfig {
    /// Probability of following an edge rather than teleporting
    pub damping: f64,
    /// Iteration budget
    pub max_iterations: usize,
    /// Stop once the L1 change of an iteration falls below this
    pub tolerance: f64,
    /// Dangling-vertex policy
    pub dangling: DanglingPolicy,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: DAMPING_FACTOR,
            max_iterations: 20,
            tolerance: 1e-6,
            dangling: DanglingPolicy::Redistribute,
        }
    }
}

impl PageRankConfig {
    /// Set the damping factor
    #[must_use]
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the iteration budget
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the dangling-vertex policy
    #[must_use]
    pub fn with_dangling(mut self, dangling: DanglingPolicy) -> Self {
        self.dangling = dangling;
        self
    }
}

/// Scores plus convergence information
#[derive(Debug, Clone)]
pub struct PageRank {
    /// Score per vertex
    pub scores: Vec<f64>,
    /// Iterations executed
    pub iterations: usize,
    /// L1 change of the last iteration
    pub error: f64,
}

/// Compute `PageRank` scores for all nodes in the graph
///
/// Uses power iteration with damping factor 0.85 and dangling mass
/// redistributed.
///
/// # Arguments
///
/// * `graph` - CSR graph representation
/// * `max_iterations` - Maximum number of power iterations (typically 20-50)
/// * `tolerance` - Convergence threshold (e.g. 1e-6)
///
/// # Algorithm
///
/// ```text
/// PR(u) = (1-d)/N + d * (Σ PR(v) / outdegree(v) + dangling / N)
/// ```
///
/// Where:
/// - d = 0.85 (damping factor)
/// - N = total number of nodes
/// - v = nodes with edges to u
///
/// # Errors
///
/// Returns error if `tolerance` is negative or NaN, or if the damping factor
/// lies outside `[0, 1]`.
///
/// # Example
///
/// ```
/// use frontier_graph::{pagerank, CsrGraph};
///
/// let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap(); // Cycle
///
/// let scores = pagerank(&graph, 20, 1e-6).unwrap();
/// assert_eq!(scores.len(), 3);
/// assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-9); // Sum = 1.0
/// ```
pub fn pagerank(graph: &CsrGraph, max_iterations: usize, tolerance: f64) -> Result<Vec<f64>> {
    let config = PageRankConfig::default()
        .with_max_iterations(max_iterations)
        .with_tolerance(tolerance);
    Ok(pagerank_with_config(graph, config)?.scores)
}

/// `PageRank` with explicit settings
///
/// # Errors
///
/// Same as [`pagerank`].
pub fn pagerank_with_config(graph: &CsrGraph, config: PageRankConfig) -> Result<PageRank> {
    pagerank_on(graph, &LocalComm, config)
}

/// `PageRank` over any adjacency and communicator (one call per rank)
///
/// Each rank computes the contributions and new scores of its owned vertices;
/// both are all-gathered so every rank sees the full arrays.
///
/// # Errors
///
/// Same as [`pagerank`].
#[allow(clippy::cast_precision_loss)] // Graphs >2^52 nodes unlikely
pub fn pagerank_on<A, C>(adjacency: &A, comm: &C, config: PageRankConfig) -> Result<PageRank>
where
    A: Adjacency,
    C: Communicator,
{
    ensure!(
        config.tolerance >= 0.0,
        "tolerance must be non-negative, got {}",
        config.tolerance
    );
    ensure!(
        (0.0..=1.0).contains(&config.damping),
        "damping must lie in [0, 1], got {}",
        config.damping
    );

    let n = adjacency.num_nodes();
    if n == 0 {
        return Ok(PageRank {
            scores: Vec::new(),
            iterations: 0,
            error: 0.0,
        });
    }

    let owned = adjacency.owned_range();
    let damping = config.damping;
    let teleport = (1.0 - damping) / n as f64;

    // Initialize: uniform distribution
    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];
    let mut contributions = vec![0.0; n];

    #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
    let out_degrees: Vec<usize> = owned
        .clone()
        .into_par_iter()
        .map(|v| adjacency.out_edges(v as u32).len())
        .collect();

    let mut iterations = 0;
    let mut error = f64::INFINITY;

    while iterations < config.max_iterations {
        // Publish contributions of owned vertices
        let dangling: f64 = contributions[owned.clone()]
            .par_iter_mut()
            .zip(scores[owned.clone()].par_iter())
            .zip(out_degrees.par_iter())
            .map(|((contribution, &score), &degree)| {
                if degree == 0 {
                    *contribution = 0.0;
                    score
                } else {
                    *contribution = score / degree as f64;
                    0.0
                }
            })
            .sum();
        comm.all_gather(&mut contributions, owned.clone());

        let dangling_share = match config.dangling {
            DanglingPolicy::Redistribute => comm.all_reduce_scalar(dangling, ReduceOp::Sum) / n as f64,
            DanglingPolicy::Drop => 0.0,
        };

        // Pull into owned vertices
        let contributions = &contributions;
        #[allow(clippy::cast_possible_truncation)]
        let local_error: f64 = next[owned.clone()]
            .par_iter_mut()
            .zip(scores[owned.clone()].par_iter())
            .enumerate()
            .map(|(i, (slot, &old))| {
                let u = (owned.start + i) as u32;
                let incoming: f64 = adjacency
                    .in_edges(u)
                    .targets
                    .iter()
                    .map(|&v| contributions[v as usize])
                    .sum();
                *slot = teleport + damping * (incoming + dangling_share);
                (*slot - old).abs()
            })
            .sum();
        comm.all_gather(&mut next, owned.clone());
        error = comm.all_reduce_scalar(local_error, ReduceOp::Sum);

        // Swap buffers
        std::mem::swap(&mut scores, &mut next);
        iterations += 1;

        if error < config.tolerance {
            tracing::debug!(iterations, error, "PageRank converged");
            break;
        }
    }

    Ok(PageRank {
        scores,
        iterations,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;

    #[test]
    fn test_pagerank_simple_chain() {
        // Linear chain: 0 → 1 → 2
        let edges = vec![(NodeId(0), NodeId(1), 1), (NodeId(1), NodeId(2), 1)];
        let graph = CsrGraph::from_edge_list(&edges).unwrap();

        let scores = pagerank(&graph, 20, 1e-6).unwrap();

        // Verify properties
        assert_eq!(scores.len(), 3);

        // Sum should be 1.0
        let sum: f64 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "Sum = {sum}");

        // In a chain, last node gets highest score (sink node)
        assert!(
            scores[2] > scores[1],
            "Node 2 should have higher score than 1"
        );
        assert!(
            scores[1] > scores[0],
            "Node 1 should have higher score than 0"
        );
    }

    #[test]
    fn test_pagerank_cycle() {
        // Cycle: 0 → 1 → 2 → 0
        let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();

        let scores = pagerank(&graph, 50, 1e-6).unwrap();

        // All scores should be approximately 1/3
        for score in &scores {
            assert!((*score - 1.0 / 3.0).abs() < 1e-9, "Score = {score}");
        }
    }

    #[test]
    fn test_pagerank_star() {
        // Star: 0 ← 1, 0 ← 2, 0 ← 3 (all point to center)
        let graph = CsrGraph::from_edges(4, &[(1, 0), (2, 0), (3, 0)]).unwrap();

        let scores = pagerank(&graph, 20, 1e-6).unwrap();

        // Center node (0) should have highest score
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert!(scores[0] > scores[3]);

        // Peripheral nodes should have equal scores
        assert!((scores[1] - scores[2]).abs() < 1e-12);
        assert!((scores[2] - scores[3]).abs() < 1e-12);
    }

    #[test]
    fn test_pagerank_star_converges_within_budget() {
        let graph = CsrGraph::from_edges(4, &[(1, 0), (2, 0), (3, 0)]).unwrap();
        let config = PageRankConfig::default()
            .with_max_iterations(100)
            .with_tolerance(1e-6);
        let result = pagerank_with_config(&graph, config).unwrap();

        assert!(result.iterations > 1 && result.iterations < 100, "{}", result.iterations);
        assert!(result.error < 1e-6, "error = {}", result.error);

        // Center mass x solves x = 0.8875 - 0.6375 x with the dangling center redistributed
        let center = 0.8875 / 1.6375;
        assert!((result.scores[0] - center).abs() < 1e-5, "{}", result.scores[0]);
        let sum: f64 = result.scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pagerank_empty_graph() {
        let graph = CsrGraph::new();
        let scores = pagerank(&graph, 20, 1e-6).unwrap();
        assert_eq!(scores.len(), 0);
    }

    #[test]
    fn test_pagerank_single_node() {
        let graph = CsrGraph::from_edges(1, &[(0, 0)]).unwrap(); // Self-loop

        let scores = pagerank(&graph, 20, 1e-6).unwrap();
        assert_eq!(scores.len(), 1);
        assert!((scores[0] - 1.0).abs() < 1e-12); // Single node gets all rank
    }

    #[test]
    fn test_pagerank_convergence() {
        // Large cycle to test convergence
        let edges: Vec<_> = (0..10).map(|i| (i, (i + 1) % 10)).collect();
        let graph = CsrGraph::from_edges(10, &edges).unwrap();

        let result =
            pagerank_with_config(&graph, PageRankConfig::default().with_max_iterations(100))
                .unwrap();

        // Uniform start is already the fixed point
        assert_eq!(result.iterations, 1);
        for score in &result.scores {
            assert!((*score - 0.1).abs() < 1e-12, "Score = {score}");
        }
    }

    #[test]
    fn test_dangling_drop_leaks_mass() {
        let graph = CsrGraph::from_edges(2, &[(0, 1)]).unwrap();
        let config = PageRankConfig::default().with_dangling(DanglingPolicy::Drop);
        let result = pagerank_with_config(&graph, config).unwrap();

        let sum: f64 = result.scores.iter().sum();
        assert!(sum < 1.0);
        assert!(result.scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_budget_respected() {
        let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let config = PageRankConfig::default()
            .with_max_iterations(3)
            .with_tolerance(0.0);
        let result = pagerank_with_config(&graph, config).unwrap();
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let graph = CsrGraph::from_edges(2, &[(0, 1)]).unwrap();
        assert!(pagerank(&graph, 10, -1.0).is_err());
    }

    #[test]
    fn test_damping_out_of_range_rejected() {
        let graph = CsrGraph::from_edges(2, &[(0, 1)]).unwrap();
        for damping in [1.5, -0.1, f64::NAN] {
            let config = PageRankConfig::default().with_damping(damping);
            let err = pagerank_with_config(&graph, config).unwrap_err();
            assert!(err.to_string().contains("damping"), "{err}");
        }
        let config = PageRankConfig::default().with_damping(1.0);
        assert!(pagerank_with_config(&graph, config).is_ok());
    }
}
