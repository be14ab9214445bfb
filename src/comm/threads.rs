//! Ranks as isolated OS threads
//!
//! Each rank runs on its own thread with its own rayon pool and its own
//! replicated state; ranks share nothing except one exchange slot per rank.
//! A collective deposits into the caller's slot, waits for every rank, reads
//! the other slots, and waits again before any slot can be reused.
//!
//! One thread per rank models the distributed build; more than one models
//! the hybrid build.

use super::{CommValue, Communicator, ReduceOp};
use anyhow::{anyhow, ensure, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::ops::Range;
use std::sync::{Arc, Barrier};

type Slot = Mutex<Option<Box<dyn Any + Send>>>;

/// A window of a rank's buffer and where it belongs
struct Window<T> {
    owned: Range<usize>,
    buf_len: usize,
    values: Vec<T>,
}

/// Check that deposited windows fit equal-length buffers and never overlap
///
/// Every rank checks every window, so a bad layout fails all ranks alike.
///
/// # Panics
///
/// Panics if a window is out of bounds, buffer lengths differ, or two
/// windows overlap.
fn check_windows(windows: &[(Range<usize>, usize)]) {
    for (rank, (owned, len)) in windows.iter().enumerate() {
        assert!(
            owned.start <= owned.end && owned.end <= *len,
            "rank {rank} gathers window {owned:?} of a buffer of {len}"
        );
        for (peer, (other, other_len)) in windows.iter().enumerate().skip(rank + 1) {
            assert_eq!(
                len, other_len,
                "ranks {rank} and {peer} gather buffers of different length"
            );
            assert!(
                owned.is_empty()
                    || other.is_empty()
                    || owned.end <= other.start
                    || other.end <= owned.start,
                "ranks {rank} and {peer} gather overlapping windows {owned:?} and {other:?}"
            );
        }
    }
}

struct Exchange {
    barrier: Barrier,
    slots: Vec<Slot>,
}

impl Exchange {
    fn new(ranks: usize) -> Self {
        Self {
            barrier: Barrier::new(ranks),
            slots: (0..ranks).map(|_| Mutex::new(None)).collect(),
        }
    }

    fn deposit<P: Any + Send>(&self, rank: usize, payload: P) {
        *self.slots[rank].lock() = Some(Box::new(payload));
    }

    /// Run `read` on `rank`'s deposit
    ///
    /// # Panics
    ///
    /// Panics if ranks entered different collectives.
    fn read<P: Any, R>(&self, rank: usize, read: impl FnOnce(&P) -> R) -> R {
        let slot = self.slots[rank].lock();
        match slot.as_ref().and_then(|payload| payload.downcast_ref::<P>()) {
            Some(payload) => read(payload),
            None => panic!("rank {rank} entered a different collective"),
        }
    }
}

/// Handle a rank uses to talk to its peers
pub struct ThreadComm {
    rank: usize,
    ranks: usize,
    exchange: Arc<Exchange>,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("ranks", &self.ranks)
            .finish_non_exhaustive()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn ranks(&self) -> usize {
        self.ranks
    }

    fn barrier(&self) {
        self.exchange.barrier.wait();
    }

    fn all_reduce<T: CommValue>(&self, buf: &mut [T], op: ReduceOp) {
        self.exchange.deposit(self.rank, buf.to_vec());
        self.barrier();

        self.exchange.read(0, |first: &Vec<T>| buf.copy_from_slice(first));
        for peer in 1..self.ranks {
            self.exchange.read(peer, |theirs: &Vec<T>| {
                for (mine, &other) in buf.iter_mut().zip(theirs) {
                    *mine = mine.combine(other, op);
                }
            });
        }
        self.barrier();
    }

    fn all_gather<T: CommValue>(&self, buf: &mut [T], owned: Range<usize>) {
        let values = buf.get(owned.clone()).map(<[T]>::to_vec).unwrap_or_default();
        self.exchange.deposit(
            self.rank,
            Window {
                owned,
                buf_len: buf.len(),
                values,
            },
        );
        self.barrier();

        let windows: Vec<_> = (0..self.ranks)
            .map(|peer| {
                self.exchange
                    .read(peer, |window: &Window<T>| (window.owned.clone(), window.buf_len))
            })
            .collect();
        check_windows(&windows);

        for peer in (0..self.ranks).filter(|&peer| peer != self.rank) {
            self.exchange.read(peer, |window: &Window<T>| {
                buf[window.owned.clone()].copy_from_slice(&window.values);
            });
        }
        self.barrier();
    }

    fn broadcast<T: CommValue>(&self, buf: &mut [T], root: usize) {
        assert!(root < self.ranks, "root {root} out of {}", self.ranks);
        if self.rank == root {
            self.exchange.deposit(root, buf.to_vec());
        }
        self.barrier();

        if self.rank != root {
            self.exchange
                .read(root, |theirs: &Vec<T>| buf.copy_from_slice(theirs));
        }
        self.barrier();
    }
}

/// Launcher for a group of thread ranks
///
/// # Example
///
/// ```
/// use frontier_graph::comm::{Communicator, ReduceOp, ThreadCluster};
///
/// let sums = ThreadCluster::new(3, 1)
///     .run(|comm| Ok(comm.all_reduce_scalar(comm.rank(), ReduceOp::Sum)))
///     .unwrap();
///
/// assert_eq!(sums, vec![3, 3, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ThreadCluster {
    ranks: usize,
    threads_per_rank: usize,
}

impl ThreadCluster {
    /// `ranks` ranks with `threads_per_rank` worker threads each
    #[must_use]
    pub const fn new(ranks: usize, threads_per_rank: usize) -> Self {
        Self {
            ranks,
            threads_per_rank,
        }
    }

    /// Number of ranks
    #[must_use]
    pub const fn ranks(&self) -> usize {
        self.ranks
    }

    /// Worker threads per rank
    #[must_use]
    pub const fn threads_per_rank(&self) -> usize {
        self.threads_per_rank
    }

    /// Run `job` on every rank and collect the results in rank order
    ///
    /// `job` runs inside the rank's rayon pool, so every parallel iterator it
    /// starts stays on that rank's threads. A rank that returns early while
    /// its peers wait in a collective stalls the group; jobs should agree on
    /// failure through a collective before bailing out.
    ///
    /// # Errors
    ///
    /// Returns error if the layout is empty, a rank pool cannot be built, a
    /// rank panics, or any rank's job fails.
    pub fn run<R, F>(&self, job: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&ThreadComm) -> Result<R> + Sync,
    {
        ensure!(self.ranks > 0, "cluster needs at least one rank");
        ensure!(
            self.threads_per_rank > 0,
            "each rank needs at least one thread"
        );

        let exchange = Arc::new(Exchange::new(self.ranks));
        let job = &job;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.ranks)
                .map(|rank| {
                    let comm = ThreadComm {
                        rank,
                        ranks: self.ranks,
                        exchange: Arc::clone(&exchange),
                    };
                    let threads = self.threads_per_rank;
                    scope.spawn(move || -> Result<R> {
                        let pool = rayon::ThreadPoolBuilder::new()
                            .num_threads(threads)
                            .thread_name(move |i| format!("rank{rank}-worker{i}"))
                            .build()?;
                        pool.install(|| job(&comm))
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("rank {rank} panicked"))?
                })
                .collect()
        })
    }
}
