//! Sparse and dense frontier encodings
//!
//! A sparse frontier is a packed list of vertex ids, cheap when few vertices
//! are active. A dense frontier is one flag per vertex, cheap to test during a
//! pull sweep. The engine converts between them whenever it changes
//! direction.

use crate::parallel::{filter_compact, sum_flags, Flag};
use crate::storage::VertexId;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Padding for candidate slots that produced no vertex
pub const NO_VERTEX: VertexId = VertexId::MAX;

/// One flag per vertex, settable from many threads
#[derive(Debug, Default)]
pub struct DenseFrontier {
    flags: Vec<AtomicBool>,
}

impl DenseFrontier {
    /// All flags lowered
    #[must_use]
    pub fn new(num_nodes: usize) -> Self {
        Self {
            flags: (0..num_nodes).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Build from plain flags
    #[must_use]
    pub fn from_flags(flags: &[bool]) -> Self {
        Self {
            flags: flags.iter().map(|&f| AtomicBool::new(f)).collect(),
        }
    }

    /// Vertices covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the frontier covers no vertices at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether `v` is active
    #[inline]
    #[must_use]
    pub fn contains(&self, v: VertexId) -> bool {
        self.flags[v as usize].load(Ordering::Relaxed)
    }

    /// Raise `v`'s flag; true only for the caller that raised it
    #[inline]
    pub fn insert(&self, v: VertexId) -> bool {
        !self.flags[v as usize].swap(true, Ordering::AcqRel)
    }

    /// Set `v`'s flag without claiming it
    #[inline]
    pub fn set(&self, v: VertexId, active: bool) {
        self.flags[v as usize].store(active, Ordering::Relaxed);
    }

    /// Active vertex count
    #[must_use]
    pub fn count(&self) -> usize {
        sum_flags(&self.flags)
    }

    /// Lower every flag
    pub fn clear(&self) {
        self.flags
            .par_iter()
            .for_each(|f| f.store(false, Ordering::Relaxed));
    }

    /// Snapshot as plain flags
    #[must_use]
    pub fn to_flags(&self) -> Vec<bool> {
        self.flags.par_iter().map(Flag::is_set).collect()
    }

    /// Overwrite from plain flags of the same length
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn load_flags(&self, flags: &[bool]) {
        assert_eq!(flags.len(), self.flags.len(), "frontier length mismatch");
        self.flags
            .par_iter()
            .zip(flags.par_iter())
            .for_each(|(cell, &f)| cell.store(f, Ordering::Relaxed));
    }
}

/// The active set for one round
#[derive(Debug)]
pub enum Frontier {
    /// Packed vertex ids, no duplicates
    Sparse(Vec<VertexId>),
    /// Flag per vertex plus the cached population
    Dense {
        /// Membership flags
        flags: DenseFrontier,
        /// Number of raised flags
        size: usize,
    },
}

impl Frontier {
    /// Single-vertex frontier
    #[must_use]
    pub fn single(v: VertexId) -> Self {
        Self::Sparse(vec![v])
    }

    /// Number of active vertices
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sparse(ids) => ids.len(),
            Self::Dense { size, .. } => *size,
        }
    }

    /// Whether no vertex is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to the sparse encoding
    #[must_use]
    pub fn into_sparse(self) -> Vec<VertexId> {
        match self {
            Self::Sparse(ids) => ids,
            Self::Dense { flags, .. } => dense_to_sparse(&flags),
        }
    }

    /// Convert to the dense encoding over `num_nodes` vertices
    #[must_use]
    pub fn into_dense(self, num_nodes: usize) -> DenseFrontier {
        match self {
            Self::Sparse(ids) => {
                let flags = DenseFrontier::new(num_nodes);
                sparse_to_dense(&ids, &flags);
                flags
            }
            Self::Dense { flags, .. } => flags,
        }
    }
}

/// Raise the flag of every listed vertex
///
/// Order-independent and idempotent.
pub fn sparse_to_dense(ids: &[VertexId], dense: &DenseFrontier) {
    ids.par_iter().for_each(|&v| dense.set(v, true));
}

/// Packed, ascending list of the raised flags
pub fn dense_to_sparse(dense: &DenseFrontier) -> Vec<VertexId> {
    #[allow(clippy::cast_possible_truncation)] // Graphs >4B nodes not supported yet
    let candidates: Vec<VertexId> = dense
        .flags
        .par_iter()
        .enumerate()
        .map(|(v, f)| if f.is_set() { v as VertexId } else { NO_VERTEX })
        .collect();
    filter_compact(&candidates, |&v| v != NO_VERTEX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_claims_once() {
        let dense = DenseFrontier::new(4);
        assert!(dense.insert(2));
        assert!(!dense.insert(2));
        assert!(dense.contains(2));
        assert_eq!(dense.count(), 1);
    }

    #[test]
    fn test_round_trip_is_same_set() {
        let ids = vec![7, 1, 4, 0];
        let dense = DenseFrontier::new(8);
        sparse_to_dense(&ids, &dense);
        let mut back = dense_to_sparse(&dense);
        back.sort_unstable();
        assert_eq!(back, vec![0, 1, 4, 7]);
    }

    #[test]
    fn test_sparse_to_dense_idempotent() {
        let dense = DenseFrontier::new(5);
        sparse_to_dense(&[3, 3, 1], &dense);
        sparse_to_dense(&[1], &dense);
        assert_eq!(dense.to_flags(), vec![false, true, false, true, false]);
    }

    #[test]
    fn test_clear() {
        let dense = DenseFrontier::from_flags(&[true, true, false]);
        dense.clear();
        assert_eq!(dense.count(), 0);
    }

    #[test]
    fn test_frontier_conversions_keep_size() {
        let frontier = Frontier::Sparse(vec![0, 2]);
        let dense = frontier.into_dense(3);
        let size = dense.count();
        let frontier = Frontier::Dense { flags: dense, size };
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.into_sparse(), vec![0, 2]);
    }
}
