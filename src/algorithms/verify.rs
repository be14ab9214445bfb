//! Sequential reference implementations
//!
//! Straightforward single-threaded versions of every algorithm, used by the
//! tools' `--verify` flag and by the test suites to check the parallel
//! results.

use super::pagerank::{DanglingPolicy, PageRankConfig};
use crate::engine::INFINITY;
use crate::storage::{CsrGraph, VertexId};
use std::collections::VecDeque;

/// Queue-based BFS distances from `root`
///
/// # Panics
///
/// Panics if `root` is out of range.
#[must_use]
pub fn reference_bfs(graph: &CsrGraph, root: VertexId) -> Vec<i64> {
    let mut distances = vec![INFINITY; graph.num_nodes()];
    let mut queue = VecDeque::new();

    distances[root as usize] = 0;
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        let next = distances[current as usize] + 1;
        for &neighbor in graph.out_neighbors(current) {
            if distances[neighbor as usize] == INFINITY {
                distances[neighbor as usize] = next;
                queue.push_back(neighbor);
            }
        }
    }

    distances
}

/// Round-based Bellman-Ford distances from `root`, plus whether the
/// distances were still changing after `num_nodes` rounds
///
/// Unweighted graphs use weight 1.
///
/// # Panics
///
/// Panics if `root` is out of range.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
pub fn reference_bellman_ford(graph: &CsrGraph, root: VertexId) -> (Vec<i64>, bool) {
    let n = graph.num_nodes();
    let mut dist = vec![INFINITY; n];
    dist[root as usize] = 0;

    for _ in 0..n {
        let mut dist_next = dist.clone();
        let mut changed = false;

        for u in 0..n as VertexId {
            let du = dist[u as usize];
            if du == INFINITY {
                continue;
            }
            let weights = graph.out_weights(u);
            for (i, &v) in graph.out_neighbors(u).iter().enumerate() {
                let w = weights.map_or(1, |w| w[i]);
                let candidate = du.saturating_add(w);
                if candidate < dist_next[v as usize] {
                    dist_next[v as usize] = candidate;
                    changed = true;
                }
            }
        }

        dist = dist_next;
        if !changed {
            return (dist, false);
        }
    }

    (dist, n > 0)
}

/// Undirected label propagation to a fixed point
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
pub fn reference_components(graph: &CsrGraph) -> Vec<VertexId> {
    let n = graph.num_nodes();
    let mut labels: Vec<VertexId> = (0..n).map(|v| v as VertexId).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for u in 0..n as VertexId {
            for &v in graph.out_neighbors(u) {
                let low = labels[u as usize].min(labels[v as usize]);
                for w in [u, v] {
                    if labels[w as usize] != low {
                        labels[w as usize] = low;
                        changed = true;
                    }
                }
            }
        }
    }

    labels
}

/// Push-based power iteration with the same stopping rule and dangling
/// policy as the parallel version
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)] // Graphs >2^52 nodes unlikely
pub fn reference_pagerank(graph: &CsrGraph, config: PageRankConfig) -> Vec<f64> {
    let n = graph.num_nodes();
    if n == 0 {
        return Vec::new();
    }

    let damping = config.damping;
    let teleport = (1.0 - damping) / n as f64;
    let mut ranks = vec![1.0 / n as f64; n];
    let mut new_ranks = vec![0.0; n];

    for _ in 0..config.max_iterations {
        new_ranks.fill(teleport);

        let mut dangling = 0.0;
        for node in 0..n as VertexId {
            let neighbors = graph.out_neighbors(node);
            if neighbors.is_empty() {
                dangling += ranks[node as usize];
                continue;
            }
            let contribution = damping * ranks[node as usize] / neighbors.len() as f64;
            for &target in neighbors {
                new_ranks[target as usize] += contribution;
            }
        }

        if config.dangling == DanglingPolicy::Redistribute {
            let share = damping * dangling / n as f64;
            for r in &mut new_ranks {
                *r += share;
            }
        }

        // Check convergence (L1 norm)
        let diff: f64 = new_ranks
            .iter()
            .zip(&ranks)
            .map(|(new, old)| (new - old).abs())
            .sum();

        std::mem::swap(&mut ranks, &mut new_ranks);

        if diff < config.tolerance {
            break;
        }
    }

    ranks
}

/// Index of the first element where `expected` and `actual` differ
#[must_use]
pub fn first_mismatch<T: PartialEq>(expected: &[T], actual: &[T]) -> Option<usize> {
    if expected.len() != actual.len() {
        return Some(expected.len().min(actual.len()));
    }
    expected.iter().zip(actual).position(|(e, a)| e != a)
}
