//! # ferropi
//!
//! Estimate π by integrating `4 / (1 + x²)` over `[0, 1]` with the composite
//! trapezoidal rule, split across a group of cooperating workers.
//!
//! The crate has two layers:
//! - A small collective runtime: [`Runtime`] runs one thread per rank and
//!   hands each a [`Communicator`] offering point-to-point messages, barrier,
//!   broadcast, reduce and all-reduce over channels.
//! - The estimator: [`quadrature`] holds the pure numeric pieces (subinterval
//!   bounds, the trapezoid loop) and [`estimator`] wires them between a
//!   broadcast of the partition count and a sum-reduction of partial sums.
//!
//! ## Supported Types
//!
//! All communication operations are generic over [`Datatype`]:
//! `f32`, `f64`, `i32`, `i64`, `u8`, `u32`, `u64`
//!
//! ## Quick Start
//!
//! ```
//! use ferropi::{estimator, Runtime};
//!
//! fn main() -> Result<(), ferropi::Error> {
//!     let runtime = Runtime::new(4)?;
//!     let results = runtime.run(|world| {
//!         let n = (world.rank() == 0).then_some(1_000_000);
//!         estimator::estimate_pi(&world, n)
//!     })?;
//!
//!     let estimate = results[0].as_ref().unwrap();
//!     assert!((estimate.value - std::f64::consts::PI).abs() < 1e-10);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A rank that returns an error or panics aborts the whole run: ranks blocked
//! in a collective wake with [`Error::Aborted`] and [`Runtime::run`] reports
//! the failure that started it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

mod comm;
pub mod config;
mod datatype;
mod error;
pub mod estimator;
pub mod launcher;
pub mod quadrature;
pub mod report;
mod status;

pub use comm::{Communicator, ANY_SOURCE, ANY_TAG};
pub use datatype::{Datatype, DatatypeTag};
pub use error::{Error, Result};
pub use estimator::Estimate;
pub use quadrature::WorkerIdentity;
pub use status::Status;

use comm::Shared;
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

/// Reduction operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReduceOp {
    /// Sum of values
    Sum = 0,
    /// Maximum value
    Max = 1,
    /// Minimum value
    Min = 2,
    /// Product of values
    Prod = 3,
}

/// Reference point for [`Runtime::wtime`].
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// A fixed-size world of cooperating ranks.
///
/// Each call to [`run`](Self::run) starts one thread per rank, gives every
/// thread its own [`Communicator`], and joins them all before returning.
///
/// # Example
///
/// ```
/// use ferropi::Runtime;
///
/// let runtime = Runtime::new(3).unwrap();
/// let ranks = runtime.run(|world| Ok((world.rank(), world.size()))).unwrap();
/// assert_eq!(ranks, vec![(0, 3), (1, 3), (2, 3)]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Runtime {
    size: i32,
}

impl Runtime {
    /// Create a world of `size` ranks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorldSize`] if `size < 1`.
    pub fn new(size: i32) -> Result<Self> {
        if size < 1 {
            return Err(Error::InvalidWorldSize(size));
        }
        Ok(Runtime { size })
    }

    /// Run `f` on every rank and collect the per-rank results in rank order.
    ///
    /// If any rank fails (error or panic) the run is aborted. The returned
    /// error is the first failure that is not merely another rank's
    /// [`Error::Aborted`] echo.
    pub fn run<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Communicator) -> Result<T> + Sync,
    {
        let (outboxes, inboxes): (Vec<_>, Vec<_>) =
            (0..self.size).map(|_| mpsc::channel()).unzip();
        let shared = Arc::new(Shared::new(outboxes));
        let f = &f;

        tracing::debug!(size = self.size, "starting run");

        let mut spawn_error = None;
        let outcomes: Vec<Result<T>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size as usize);
            for (rank, inbox) in inboxes.into_iter().enumerate() {
                let rank = rank as i32;
                let comm = Communicator::new(rank, Arc::clone(&shared), inbox);
                let rank_shared = Arc::clone(&shared);
                let spawned = thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || {
                        let _guard = AbortOnUnwind(&rank_shared);
                        let result = f(comm);
                        if let Err(err) = &result {
                            if !err.is_abort() {
                                tracing::warn!(rank, error = %err, "rank failed, aborting run");
                            }
                            rank_shared.abort();
                        }
                        result
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        shared.abort();
                        spawn_error = Some(err);
                        break;
                    }
                }
            }

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(Error::RankPanicked(rank as i32)))
                })
                .collect()
        });

        if let Some(err) = spawn_error {
            return Err(Error::Io(err));
        }
        collect_outcomes(outcomes)
    }

    /// Get the current wall-clock time in seconds.
    ///
    /// Monotonic and high-resolution; only differences between two calls are
    /// meaningful.
    pub fn wtime() -> f64 {
        EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
    }
}

/// Sets the abort flag if the owning rank unwinds.
struct AbortOnUnwind<'a>(&'a Shared);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

fn collect_outcomes<T>(outcomes: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut echo = None;
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(err) if err.is_abort() => {
                echo.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    match echo {
        Some(err) => Err(err),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_world_sizes_rejected() {
        assert!(matches!(Runtime::new(0), Err(Error::InvalidWorldSize(0))));
        assert!(matches!(Runtime::new(-3), Err(Error::InvalidWorldSize(-3))));
    }

    #[test]
    fn results_come_back_in_rank_order() {
        let out = Runtime::new(8)
            .unwrap()
            .run(|world| Ok(world.rank() * 10))
            .unwrap();
        assert_eq!(out, (0..8).map(|r| r * 10).collect::<Vec<_>>());
    }

    #[test]
    fn failing_rank_aborts_blocked_peers() {
        let err = Runtime::new(4)
            .unwrap()
            .run(|world| {
                if world.rank() == 2 {
                    return Err(Error::InvalidInput("boom".into()));
                }
                world.barrier()
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg == "boom"));
    }

    #[test]
    fn panicking_rank_is_reported() {
        let err = Runtime::new(3)
            .unwrap()
            .run(|world| {
                if world.rank() == 1 {
                    panic!("rank 1 gives up");
                }
                world.allreduce_scalar(1i32, ReduceOp::Sum)
            })
            .unwrap_err();
        assert!(matches!(err, Error::RankPanicked(1)));
    }

    #[test]
    fn wtime_is_monotonic() {
        let t1 = Runtime::wtime();
        let t2 = Runtime::wtime();
        assert!(t1 >= 0.0);
        assert!(t2 >= t1);
    }
}
