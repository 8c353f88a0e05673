//! Composite trapezoidal rule for `∫₀¹ 4 / (1 + x²) dx = π`.
//!
//! Everything here is pure and single-threaded. The parallel decomposition
//! only enters through [`WorkerIdentity`], which is passed in explicitly so
//! the bounds and the loop can be tested without starting a runtime.

use crate::error::{Error, Result};
use crate::Communicator;
use std::ops::Range;

/// A worker's place in the group: its rank and the total number of workers.
///
/// Assigned once at start-up and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerIdentity {
    /// Rank of this worker, in `0..size`.
    pub rank: i32,
    /// Total number of workers.
    pub size: i32,
}

impl WorkerIdentity {
    /// Build an identity, checking `size >= 1` and `0 <= rank < size`.
    pub fn new(rank: i32, size: i32) -> Result<Self> {
        if size < 1 {
            return Err(Error::InvalidWorldSize(size));
        }
        if !(0..size).contains(&rank) {
            return Err(Error::InvalidRank(rank));
        }
        Ok(WorkerIdentity { rank, size })
    }

    /// Identity of the calling rank within `comm`.
    pub fn of(comm: &Communicator) -> Result<Self> {
        Self::new(comm.rank(), comm.size())
    }

    /// Whether this worker is the coordinator (rank 0).
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }

    /// This worker's block of trapezoid indices out of `partitions`.
    ///
    /// `[floor(r·N/P), floor((r+1)·N/P))`. Computed in 128-bit integers so
    /// `r·N` cannot overflow. When `N` is not a multiple of `P`, block sizes
    /// differ by at most one; when `N < P` some blocks are empty.
    pub fn subinterval(&self, partitions: i64) -> Range<i64> {
        let n = i128::from(partitions.max(0));
        let p = i128::from(self.size);
        let r = i128::from(self.rank);
        let start = r * n / p;
        let end = (r + 1) * n / p;
        start as i64..end as i64
    }
}

/// The integrand `f(x) = 4 / (1 + x²)`.
#[inline]
pub fn integrand(x: f64) -> f64 {
    4.0 / (1.0 + x * x)
}

/// Sum of the trapezoids with indices in `range`, each of width `1/partitions`.
///
/// Accumulates left to right from `0.0`. An empty range gives `0.0`.
pub fn trapezoid_sum(partitions: i64, range: Range<i64>) -> f64 {
    let dx = 1.0 / partitions as f64;
    let mut partial = 0.0;
    for i in range {
        let left = integrand(i as f64 * dx);
        let right = integrand((i + 1) as f64 * dx);
        partial += 0.5 * dx * (left + right);
    }
    partial
}

/// Single-threaded estimate over all of `[0, partitions)`.
pub fn trapezoid_pi(partitions: i64) -> Result<f64> {
    if partitions <= 0 {
        return Err(Error::InvalidPartitionCount(partitions));
    }
    Ok(trapezoid_sum(partitions, 0..partitions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn blocks(partitions: i64, size: i32) -> Vec<Range<i64>> {
        (0..size)
            .map(|rank| WorkerIdentity { rank, size }.subinterval(partitions))
            .collect()
    }

    #[test]
    fn four_partitions_by_hand() {
        // f at 0, 1/4, 1/2, 3/4, 1 is 4, 64/17, 16/5, 64/25, 2.
        let expected = 0.125 * (4.0 + 2.0 * (64.0 / 17.0 + 16.0 / 5.0 + 64.0 / 25.0) + 2.0);
        let value = trapezoid_pi(4).unwrap();
        assert!((value - expected).abs() < 1e-14, "{value} vs {expected}");
        assert!((value - 3.131_176_470_588_235).abs() < 1e-14);
    }

    #[test]
    fn one_million_partitions_matches_pi() {
        let value = trapezoid_pi(1_000_000).unwrap();
        assert!((value - PI).abs() < 1e-11, "error {}", (value - PI).abs());
    }

    #[test]
    fn error_shrinks_quadratically() {
        let errors: Vec<f64> = [100, 10_000, 1_000_000]
            .iter()
            .map(|&n| (trapezoid_pi(n).unwrap() - PI).abs())
            .collect();
        assert!(errors[0] > errors[1] && errors[1] > errors[2], "{errors:?}");
        // Trapezoid error for this integrand is 1/(6N²).
        assert!((errors[0] * 6.0 * 1e4 - 1.0).abs() < 1e-3, "{errors:?}");
        assert!((errors[1] * 6.0 * 1e8 - 1.0).abs() < 1e-2, "{errors:?}");
    }

    #[test]
    fn non_positive_partitions_rejected() {
        assert!(matches!(trapezoid_pi(0), Err(Error::InvalidPartitionCount(0))));
        assert!(matches!(trapezoid_pi(-4), Err(Error::InvalidPartitionCount(-4))));
    }

    #[test]
    fn uneven_blocks_split_by_floor_division() {
        assert_eq!(blocks(10, 4), vec![0..2, 2..5, 5..7, 7..10]);
        assert_eq!(blocks(3, 5), vec![0..0, 0..1, 1..1, 1..2, 2..3]);
    }

    #[test]
    fn huge_partition_counts_do_not_overflow() {
        let last = WorkerIdentity { rank: 7, size: 8 }.subinterval(i64::MAX);
        assert_eq!(last.end, i64::MAX);
    }

    #[test]
    fn identity_validation() {
        assert!(WorkerIdentity::new(0, 1).unwrap().is_coordinator());
        assert!(matches!(WorkerIdentity::new(0, 0), Err(Error::InvalidWorldSize(0))));
        assert!(matches!(WorkerIdentity::new(3, 3), Err(Error::InvalidRank(3))));
        assert!(matches!(WorkerIdentity::new(-1, 3), Err(Error::InvalidRank(-1))));
    }

    #[test]
    fn identity_of_every_rank() {
        let ids = crate::Runtime::new(3)
            .unwrap()
            .run(|world| WorkerIdentity::of(&world))
            .unwrap();
        assert_eq!(ids, (0..3).map(|rank| WorkerIdentity { rank, size: 3 }).collect::<Vec<_>>());
        assert!(ids[0].is_coordinator() && !ids[1].is_coordinator());
    }

    #[test]
    fn empty_range_sums_to_zero() {
        assert_eq!(trapezoid_sum(10, 4..4), 0.0);
    }

    proptest! {
        #[test]
        fn blocks_are_disjoint_and_exhaustive(size in 1i32..64, partitions in 0i64..100_000) {
            let blocks = blocks(partitions, size);
            prop_assert_eq!(blocks[0].start, 0);
            prop_assert_eq!(blocks[blocks.len() - 1].end, partitions);
            for pair in blocks.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            let lengths: Vec<i64> = blocks.iter().map(|b| b.end - b.start).collect();
            let min = *lengths.iter().min().unwrap();
            let max = *lengths.iter().max().unwrap();
            prop_assert!(max - min <= 1);
        }

        #[test]
        fn split_sum_matches_whole(size in 1i32..16, partitions in 1i64..5_000) {
            let whole = trapezoid_pi(partitions).unwrap();
            let split: f64 = blocks(partitions, size)
                .into_iter()
                .map(|range| trapezoid_sum(partitions, range))
                .sum();
            prop_assert!((whole - split).abs() < 1e-12);
        }
    }
}
