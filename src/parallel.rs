//! Parallel primitives used by every traversal round
//!
//! Based on the PBBS `sequence` primitives (Blelloch et al.): exclusive
//! prefix sums, stream compaction and flag counting, plus the priority
//! (atomic-min) update that makes concurrent relaxation race-free.
//!
//! Block boundaries are fixed by [`SCAN_BLOCK`], not by the thread count,
//! so every result is identical no matter how many threads run it.

use rayon::prelude::*;
use std::ops::Add;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Elements per block in the blocked scan and filter
pub const SCAN_BLOCK: usize = 4096;

/// Exclusive prefix sums of `input`, plus the total
///
/// # Example
///
/// ```
/// use frontier_graph::parallel::plus_scan;
///
/// let (offsets, total) = plus_scan(&[3_usize, 0, 2, 5]);
/// assert_eq!(offsets, vec![0, 3, 3, 5]);
/// assert_eq!(total, 10);
/// ```
pub fn plus_scan<T>(input: &[T]) -> (Vec<T>, T)
where
    T: Copy + Default + Send + Sync + Add<Output = T>,
{
    if input.len() <= SCAN_BLOCK {
        return sequential_scan(input, T::default());
    }

    // Pass 1: per-block totals
    let block_sums: Vec<T> = input
        .par_chunks(SCAN_BLOCK)
        .map(|block| block.iter().fold(T::default(), |acc, &x| acc + x))
        .collect();

    // Block carries are few; scan them serially
    let (carries, total) = sequential_scan(&block_sums, T::default());

    // Pass 2: local scans seeded with the block carry
    let mut output = vec![T::default(); input.len()];
    output
        .par_chunks_mut(SCAN_BLOCK)
        .zip(input.par_chunks(SCAN_BLOCK))
        .zip(carries.par_iter())
        .for_each(|((out, block), &carry)| {
            let mut running = carry;
            for (slot, &x) in out.iter_mut().zip(block) {
                *slot = running;
                running = running + x;
            }
        });

    (output, total)
}

fn sequential_scan<T>(input: &[T], seed: T) -> (Vec<T>, T)
where
    T: Copy + Add<Output = T>,
{
    let mut running = seed;
    let output = input
        .iter()
        .map(|&x| {
            let current = running;
            running = running + x;
            current
        })
        .collect();
    (output, running)
}

/// Stream-compact the elements satisfying `keep`, preserving order
///
/// Each block counts its survivors, a [`plus_scan`] over the counts gives
/// every block a private output window, and the blocks then write in
/// parallel without coordination.
pub fn filter_compact<T, P>(input: &[T], keep: P) -> Vec<T>
where
    T: Copy + Default + Send + Sync,
    P: Fn(&T) -> bool + Sync,
{
    let counts: Vec<usize> = input
        .par_chunks(SCAN_BLOCK)
        .map(|block| block.iter().filter(|x| keep(x)).count())
        .collect();
    let (offsets, total) = plus_scan(&counts);

    let mut output = vec![T::default(); total];
    split_by_offsets(&mut output, &offsets)
        .into_par_iter()
        .zip(input.par_chunks(SCAN_BLOCK))
        .for_each(|(window, block)| {
            for (slot, &x) in window.iter_mut().zip(block.iter().filter(|x| keep(x))) {
                *slot = x;
            }
        });
    output
}

/// Split `buffer` into consecutive windows starting at each exclusive offset
///
/// Window `i` covers `offsets[i]..offsets[i + 1]`; the last window runs to
/// the end of the buffer. Offsets must be non-decreasing and within bounds.
///
/// # Panics
///
/// Panics if an offset exceeds the buffer length or offsets decrease.
pub fn split_by_offsets<'a, T>(buffer: &'a mut [T], offsets: &[usize]) -> Vec<&'a mut [T]> {
    let mut windows = Vec::with_capacity(offsets.len());
    let mut rest = buffer;
    let mut consumed = 0;

    for (i, &start) in offsets.iter().enumerate() {
        assert!(start >= consumed, "offsets must be non-decreasing");
        let end = offsets.get(i + 1).copied().unwrap_or(consumed + rest.len());
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(start - consumed);
        let (window, tail) = tail.split_at_mut(end - start);
        windows.push(window);
        rest = tail;
        consumed = end;
    }

    windows
}

/// A boolean flag readable from a shared slice
pub trait Flag: Sync {
    /// Whether the flag is raised
    fn is_set(&self) -> bool;
}

impl Flag for bool {
    #[inline]
    fn is_set(&self) -> bool {
        *self
    }
}

impl Flag for AtomicBool {
    #[inline]
    fn is_set(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Population count of a flag array
pub fn sum_flags<F: Flag>(flags: &[F]) -> usize {
    flags
        .par_chunks(SCAN_BLOCK)
        .map(|block| block.iter().filter(|f| f.is_set()).count())
        .sum()
}

/// Atomic "update if strictly smaller"
///
/// The single synchronization primitive behind concurrent relaxation:
/// many threads may offer candidates for the same cell and the cell ends
/// at the minimum without a lock.
pub trait PriorityUpdate {
    /// Cell value type
    type Value: Copy + Ord;

    /// Store `candidate` iff it is strictly smaller than the current value
    ///
    /// Retries under contention; returns whether this call changed the cell.
    fn priority_update(&self, candidate: Self::Value) -> bool;
}

macro_rules! impl_priority_update {
    ($($atomic:ty => $value:ty),* $(,)?) => {$(
        impl PriorityUpdate for $atomic {
            type Value = $value;

            #[inline]
            fn priority_update(&self, candidate: $value) -> bool {
                let mut current = self.load(Ordering::Relaxed);
                while candidate < current {
                    match self.compare_exchange_weak(
                        current,
                        candidate,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return true,
                        Err(observed) => current = observed,
                    }
                }
                false
            }
        }
    )*};
}

impl_priority_update!(
    AtomicI64 => i64,
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize,
);

/// Free-function form of [`PriorityUpdate::priority_update`]
#[inline]
pub fn priority_update<C: PriorityUpdate>(cell: &C, candidate: C::Value) -> bool {
    cell.priority_update(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_scan_small() {
        let (out, total) = plus_scan(&[1_usize, 2, 3, 4]);
        assert_eq!(out, vec![0, 1, 3, 6]);
        assert_eq!(total, 10);
    }

    #[test]
    fn test_plus_scan_empty() {
        let (out, total) = plus_scan::<usize>(&[]);
        assert!(out.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_plus_scan_spans_blocks() {
        let input: Vec<u64> = (0..(SCAN_BLOCK as u64 * 3 + 17)).map(|i| i % 7).collect();
        let (out, total) = plus_scan(&input);

        let mut running = 0;
        for (i, &x) in input.iter().enumerate() {
            assert_eq!(out[i], running, "prefix at {i}");
            running += x;
        }
        assert_eq!(total, running);
    }

    #[test]
    fn test_plus_scan_same_under_any_pool_size() {
        let input: Vec<i64> = (0..20_000).map(|i| (i * 31) % 13 - 6).collect();
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| plus_scan(&input));
        let many = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| plus_scan(&input));
        assert_eq!(single, many);
    }

    #[test]
    fn test_filter_compact_preserves_order() {
        let input: Vec<u32> = (0..10_000).collect();
        let evens = filter_compact(&input, |&x| x % 2 == 0);
        assert_eq!(evens.len(), 5_000);
        assert!(evens.windows(2).all(|w| w[0] < w[1]));
        assert!(evens.iter().all(|x| x % 2 == 0));
    }

    #[test]
    fn test_filter_compact_sentinel() {
        let input = [u32::MAX, 4, u32::MAX, u32::MAX, 9, 0];
        assert_eq!(filter_compact(&input, |&x| x != u32::MAX), vec![4, 9, 0]);
    }

    #[test]
    fn test_split_by_offsets() {
        let mut buf = [0_u8; 6];
        let windows = split_by_offsets(&mut buf, &[0, 2, 2, 5]);
        let lens: Vec<usize> = windows.iter().map(|w| w.len()).collect();
        assert_eq!(lens, vec![2, 0, 3, 1]);
    }

    #[test]
    fn test_sum_flags() {
        assert_eq!(sum_flags(&[true, false, true, true]), 3);
        let atomics: Vec<AtomicBool> = (0..9).map(|i| AtomicBool::new(i % 3 == 0)).collect();
        assert_eq!(sum_flags(&atomics), 3);
    }

    #[test]
    fn test_priority_update_only_lowers() {
        let cell = AtomicI64::new(10);
        assert!(priority_update(&cell, 7));
        assert!(!priority_update(&cell, 7));
        assert!(!priority_update(&cell, 12));
        assert_eq!(cell.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_priority_update_under_contention() {
        let cell = AtomicU32::new(u32::MAX);
        let winners: usize = (0..10_000_u32)
            .into_par_iter()
            .rev()
            .map(|candidate| usize::from(cell.priority_update(candidate)))
            .sum();
        assert_eq!(cell.load(Ordering::Relaxed), 0);
        assert!(winners >= 1);
    }
}
