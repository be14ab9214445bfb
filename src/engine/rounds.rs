//! Sparse (push) and dense (pull) round bodies

use super::{snapshot, Relax};
use crate::comm::{Communicator, ReduceOp};
use crate::frontier::{dense_to_sparse, DenseFrontier, Frontier, NO_VERTEX};
use crate::parallel::{filter_compact, plus_scan, split_by_offsets, sum_flags, PriorityUpdate};
use crate::storage::{Adjacency, EdgeView, VertexId};
use rayon::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Buffers reused across rounds
pub(super) struct Workspace {
    /// Next-frontier membership claimed during a sparse round
    claims: DenseFrontier,
}

impl Workspace {
    pub(super) fn new(num_nodes: usize) -> Self {
        Self {
            claims: DenseFrontier::new(num_nodes),
        }
    }
}

pub(super) struct Outcome {
    pub(super) local_updates: usize,
    pub(super) compute: Duration,
    pub(super) sync: Duration,
}

/// One round's view of the shared state
pub(super) struct Round<'a, A, C, R> {
    pub(super) adjacency: &'a A,
    pub(super) comm: &'a C,
    pub(super) relax: &'a R,
    pub(super) current: &'a [AtomicI64],
    pub(super) next: &'a [AtomicI64],
}

impl<A, C, R> Round<'_, A, C, R>
where
    A: Adjacency,
    C: Communicator,
    R: Relax,
{
    /// `next` starts as a copy of `current`
    pub(super) fn copy_current(&self) {
        self.next
            .par_iter()
            .zip(self.current.par_iter())
            .for_each(|(n, c)| n.store(c.load(Ordering::Relaxed), Ordering::Relaxed));
    }

    fn store_next(&self, values: &[i64]) {
        self.next
            .par_iter()
            .zip(values.par_iter())
            .for_each(|(cell, &v)| cell.store(v, Ordering::Relaxed));
    }

    fn push_degree(&self, u: VertexId) -> usize {
        let back = if self.relax.symmetric() {
            self.adjacency.in_edges(u).len()
        } else {
            0
        };
        self.adjacency.out_edges(u).len() + back
    }

    /// Offer `value` along `edges`, recording first claims in `slots`
    fn offer(&self, value: i64, edges: EdgeView<'_>, slots: &mut [VertexId], claims: &DenseFrontier) {
        for ((v, weight), slot) in edges.iter().zip(slots.iter_mut()) {
            let Some(offer) = self.relax.propagate(value, weight) else {
                continue;
            };
            if self.next[v as usize].priority_update(offer) && claims.insert(v) {
                *slot = v;
            }
        }
    }

    /// Lower `best` with frontier offers along `edges`; true once scanning can stop
    fn best_offer(&self, edges: EdgeView<'_>, frontier: &DenseFrontier, best: &mut i64) -> bool {
        for (v, weight) in edges.iter() {
            if !frontier.contains(v) {
                continue;
            }
            let value = self.current[v as usize].load(Ordering::Relaxed);
            if let Some(offer) = self.relax.propagate(value, weight) {
                if offer < *best {
                    *best = offer;
                    if self.relax.first_offer_wins() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Push from every owned frontier vertex
    ///
    /// Each frontier vertex gets a private window of candidate slots sized by
    /// its degree; a slot receives the neighbor only if this push both lowered
    /// the neighbor's value and was the first to claim it for the next
    /// frontier.
    pub(super) fn sparse(
        &self,
        frontier: &[VertexId],
        workspace: &Workspace,
    ) -> (Frontier, Outcome) {
        let start = Instant::now();
        let claims = &workspace.claims;

        let owned = filter_compact(frontier, |&u| self.adjacency.owns(u));
        let degrees: Vec<usize> = owned.par_iter().map(|&u| self.push_degree(u)).collect();
        let (offsets, total) = plus_scan(&degrees);

        let mut candidates = vec![NO_VERTEX; total];
        split_by_offsets(&mut candidates, &offsets)
            .into_par_iter()
            .zip(owned.par_iter())
            .for_each(|(window, &u)| {
                let value = self.current[u as usize].load(Ordering::Relaxed);
                let out = self.adjacency.out_edges(u);
                let (front, back) = window.split_at_mut(out.len());
                self.offer(value, out, front, claims);
                if self.relax.symmetric() {
                    self.offer(value, self.adjacency.in_edges(u), back, claims);
                }
            });

        let claimed = filter_compact(&candidates, |&v| v != NO_VERTEX);
        let local_updates = claimed.len();
        let compute = start.elapsed();

        let sync_start = Instant::now();
        let next_ids = if self.comm.is_single() {
            claimed.par_iter().for_each(|&v| claims.set(v, false));
            claimed
        } else {
            let mut values = snapshot(self.next);
            self.comm.all_reduce(&mut values, ReduceOp::Min);
            self.store_next(&values);

            let mut flags = claims.to_flags();
            self.comm.all_reduce(&mut flags, ReduceOp::Or);
            claims.load_flags(&flags);
            let merged = dense_to_sparse(claims);
            claims.clear();
            merged
        };

        let outcome = Outcome {
            local_updates,
            compute,
            sync: sync_start.elapsed(),
        };
        (Frontier::Sparse(next_ids), outcome)
    }

    /// Pull into every owned vertex that can still improve
    pub(super) fn dense(&self, frontier: &DenseFrontier) -> (Frontier, Outcome) {
        let start = Instant::now();
        let owned = self.adjacency.owned_range();

        #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
        let updated: Vec<bool> = owned
            .clone()
            .into_par_iter()
            .map(|u| self.pull(u as VertexId, frontier))
            .collect();
        let local_updates = sum_flags(&updated);
        let compute = start.elapsed();

        let sync_start = Instant::now();
        let flags = if self.comm.is_single() {
            updated
        } else {
            let mut values = snapshot(self.next);
            self.comm.all_gather(&mut values, owned.clone());
            self.store_next(&values);

            let mut flags = vec![false; self.current.len()];
            flags[owned.clone()].copy_from_slice(&updated);
            self.comm.all_gather(&mut flags, owned);
            flags
        };
        let size = sum_flags(&flags);

        let outcome = Outcome {
            local_updates,
            compute,
            sync: sync_start.elapsed(),
        };
        let next = Frontier::Dense {
            flags: DenseFrontier::from_flags(&flags),
            size,
        };
        (next, outcome)
    }

    /// Best frontier offer into `u`; true if it improved `u`
    fn pull(&self, u: VertexId, frontier: &DenseFrontier) -> bool {
        let mine = self.current[u as usize].load(Ordering::Relaxed);
        if self.relax.settled(mine) {
            return false;
        }

        let mut best = mine;
        let done = self.best_offer(self.adjacency.in_edges(u), frontier, &mut best);
        if !done && self.relax.symmetric() {
            self.best_offer(self.adjacency.out_edges(u), frontier, &mut best);
        }

        if best < mine {
            // Only this iteration writes `u`
            self.next[u as usize].store(best, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}
