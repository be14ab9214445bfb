//! Collective communication between ranks
//!
//! Every rank holds a full replica of the per-vertex arrays but computes only
//! its owned range. After each compute phase the replicas are reconciled with
//! a collective: an element-wise reduction for values pushed across ranks, or
//! a gather of owned windows for values each rank computed alone.
//!
//! Collectives are blocking and must be entered by every rank in the same
//! order with the same buffer lengths.

pub mod threads;

pub use threads::{ThreadCluster, ThreadComm};

use std::ops::Range;

/// Element-wise combination used by [`Communicator::all_reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Sum (logical or for `bool`)
    Sum,
    /// Logical or; maximum for numbers
    Or,
    /// Logical and; minimum for numbers
    And,
}

/// A value that can travel through a collective
pub trait CommValue: Copy + Send + Sync + 'static {
    /// Combine two values under `op`
    #[must_use]
    fn combine(self, other: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_comm_value_ord {
    ($($t:ty),*) => {$(
        impl CommValue for $t {
            #[inline]
            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Min | ReduceOp::And => self.min(other),
                    ReduceOp::Max | ReduceOp::Or => self.max(other),
                    ReduceOp::Sum => self + other,
                }
            }
        }
    )*};
}

impl_comm_value_ord!(i64, u32, u64, usize);

impl CommValue for f64 {
    #[inline]
    fn combine(self, other: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Min | ReduceOp::And => self.min(other),
            ReduceOp::Max | ReduceOp::Or => self.max(other),
            ReduceOp::Sum => self + other,
        }
    }
}

impl CommValue for bool {
    #[inline]
    fn combine(self, other: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Min | ReduceOp::And => self && other,
            ReduceOp::Max | ReduceOp::Or | ReduceOp::Sum => self || other,
        }
    }
}

/// Rank-level collectives over plain slices
pub trait Communicator: Sync {
    /// This rank, in `0..ranks()`
    fn rank(&self) -> usize;

    /// Number of ranks taking part
    fn ranks(&self) -> usize;

    /// Block until every rank arrives
    fn barrier(&self);

    /// Replace `buf` on every rank with the element-wise combination of all
    /// ranks' buffers
    ///
    /// Ranks are folded in rank order, so floating-point sums are identical
    /// everywhere.
    fn all_reduce<T: CommValue>(&self, buf: &mut [T], op: ReduceOp);

    /// Every rank contributes `buf[owned]`; afterwards every rank's `buf`
    /// holds all contributions
    ///
    /// Owned windows must be disjoint and fit equal-length buffers; ranks
    /// that break this panic together.
    fn all_gather<T: CommValue>(&self, buf: &mut [T], owned: Range<usize>);

    /// Copy `root`'s `buf` to every rank
    fn broadcast<T: CommValue>(&self, buf: &mut [T], root: usize);

    /// [`all_reduce`](Self::all_reduce) of one value
    fn all_reduce_scalar<T: CommValue>(&self, value: T, op: ReduceOp) -> T {
        let mut buf = [value];
        self.all_reduce(&mut buf, op);
        buf[0]
    }

    /// Whether this is the only rank
    fn is_single(&self) -> bool {
        self.ranks() == 1
    }
}

/// The single-address-space communicator: one rank, every collective a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalComm;

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        0
    }

    fn ranks(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce<T: CommValue>(&self, _buf: &mut [T], _op: ReduceOp) {}

    fn all_gather<T: CommValue>(&self, _buf: &mut [T], _owned: Range<usize>) {}

    fn broadcast<T: CommValue>(&self, _buf: &mut [T], _root: usize) {}
}
