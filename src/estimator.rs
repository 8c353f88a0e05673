//! The parallel estimator: broadcast N, integrate locally, sum-reduce.
//!
//! ```text
//! rank 0: acquire N ──┐
//!                     ├─ broadcast(N) ─ trapezoid_sum(block) ─ reduce(Sum) ─┬─ report
//! rank r:  ───────────┘                                                     └─ (done)
//! ```
//!
//! The two collectives are the only synchronization points. Between them
//! every rank works on its own block of indices with no shared state.

use crate::error::{Error, Result};
use crate::quadrature::{trapezoid_sum, WorkerIdentity};
use crate::report::PROMPT;
use crate::{Communicator, ReduceOp, Runtime};
use std::f64::consts::PI;
use std::io::{BufRead, Write};

/// Rank that acquires N and receives the final estimate.
pub const COORDINATOR: i32 = 0;

const ACQUIRED: i64 = 1;

/// The coordinator's view of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Estimated value of π.
    pub value: f64,
    /// Partition count N that was used.
    pub partitions: i64,
    /// Number of workers that took part.
    pub workers: i32,
    /// Wall-clock seconds from acquiring N to receiving the reduced sum.
    pub elapsed: f64,
    /// Fastest per-worker compute time, in seconds.
    pub compute_min: f64,
    /// Slowest per-worker compute time, in seconds.
    pub compute_max: f64,
}

impl Estimate {
    /// Absolute distance from π.
    pub fn abs_error(&self) -> f64 {
        (self.value - PI).abs()
    }
}

/// Prompt on `output`, then read the partition count from `input`.
///
/// Blank lines are skipped. A missing or non-integer answer is an
/// [`Error::InvalidInput`]; the sign is not checked here.
pub fn acquire_partitions<R, W>(input: &mut R, output: &mut W) -> Result<i64>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{PROMPT}")?;
    output.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(Error::InvalidInput("no partition count provided".into()));
        }
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        return answer.parse::<i64>().map_err(|_| {
            Error::InvalidInput(format!("expected an integer partition count, got {answer:?}"))
        });
    }
}

/// Run the estimator on the calling rank.
///
/// Must be called by every rank of `world`. `acquire` is invoked only on the
/// coordinator, and the wall-clock timer starts as soon as it returns.
///
/// Returns `Some(estimate)` on the coordinator and `None` on every other
/// rank. A non-positive N is rejected on every rank after the broadcast, so
/// all ranks leave together. If `acquire` itself failed, the coordinator
/// broadcasts a failed status alongside N and returns the acquisition error,
/// while every other rank returns [`Error::Aborted`].
pub fn run_estimator<A>(world: &Communicator, acquire: A) -> Result<Option<Estimate>>
where
    A: FnOnce() -> Result<i64>,
{
    let me = WorkerIdentity::of(world)?;

    let (acquired, started) = if me.is_coordinator() {
        let acquired = acquire();
        (Some(acquired), Runtime::wtime())
    } else {
        (None, 0.0)
    };
    // [status, N]: status 0 means the coordinator could not acquire N.
    let (mut header, acquire_error) = match acquired {
        Some(Ok(n)) => ([ACQUIRED, n], None),
        Some(Err(err)) => ([0, 0], Some(err)),
        None => ([0, 0], None),
    };

    world.broadcast(&mut header, COORDINATOR)?;
    if let Some(err) = acquire_error {
        return Err(err);
    }
    let [status, partitions] = header;
    if status != ACQUIRED {
        return Err(Error::Aborted);
    }
    if partitions <= 0 {
        return Err(Error::InvalidPartitionCount(partitions));
    }

    let block = me.subinterval(partitions);
    tracing::debug!(rank = me.rank, start = block.start, end = block.end, "integrating block");

    let compute_start = Runtime::wtime();
    let partial = trapezoid_sum(partitions, block);
    let compute = Runtime::wtime() - compute_start;

    let total = world.reduce_scalar(partial, ReduceOp::Sum, COORDINATOR)?;
    let elapsed = Runtime::wtime() - started;

    let compute_min = world.reduce_scalar(compute, ReduceOp::Min, COORDINATOR)?;
    let compute_max = world.reduce_scalar(compute, ReduceOp::Max, COORDINATOR)?;

    Ok(total.map(|value| Estimate {
        value,
        partitions,
        workers: me.size,
        elapsed,
        compute_min: compute_min.unwrap_or(compute),
        compute_max: compute_max.unwrap_or(compute),
    }))
}

/// Run the estimator with a partition count already known to the coordinator.
///
/// `partitions` is only read on the coordinator; other ranks may pass `None`.
pub fn estimate_pi(world: &Communicator, partitions: Option<i64>) -> Result<Option<Estimate>> {
    run_estimator(world, || {
        partitions.ok_or_else(|| Error::InvalidInput("no partition count provided".into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn acquire_echoes_prompt_and_parses() {
        let mut input = Cursor::new("\n  250 \n");
        let mut output = Vec::new();
        let n = acquire_partitions(&mut input, &mut output).unwrap();
        assert_eq!(n, 250);
        assert_eq!(String::from_utf8(output).unwrap(), format!("{PROMPT}\n"));
    }

    #[test]
    fn acquire_rejects_garbage() {
        let mut output = Vec::new();
        let err = acquire_partitions(&mut Cursor::new("lots\n"), &mut output).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("lots")));
    }

    #[test]
    fn acquire_rejects_empty_input() {
        let mut output = Vec::new();
        let err = acquire_partitions(&mut Cursor::new(""), &mut output).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn acquire_leaves_sign_to_the_estimator() {
        let mut output = Vec::new();
        assert_eq!(acquire_partitions(&mut Cursor::new("-3\n"), &mut output).unwrap(), -3);
    }

    #[test]
    fn only_coordinator_gets_an_estimate() {
        let out = Runtime::new(3)
            .unwrap()
            .run(|world| {
                let n = (world.rank() == COORDINATOR).then_some(1_000);
                estimate_pi(&world, n)
            })
            .unwrap();
        let estimate = out[0].as_ref().unwrap();
        assert_eq!(estimate.partitions, 1_000);
        assert_eq!(estimate.workers, 3);
        assert!(estimate.elapsed >= 0.0);
        assert!(estimate.compute_min <= estimate.compute_max);
        assert!(out[1].is_none() && out[2].is_none());
    }

    #[test]
    fn acquire_error_reaches_caller() {
        let err = Runtime::new(2)
            .unwrap()
            .run(|world| run_estimator(&world, || Err(Error::InvalidInput("bad".into()))))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg == "bad"));
    }

    #[test]
    fn failed_acquire_is_not_an_invalid_count_on_workers() {
        let out = Runtime::new(4)
            .unwrap()
            .run(|world| Ok(run_estimator(&world, || Err(Error::InvalidInput("bad".into())))))
            .unwrap();
        assert!(matches!(out[0], Err(Error::InvalidInput(ref msg)) if msg == "bad"));
        for outcome in &out[1..] {
            assert!(matches!(outcome, Err(Error::Aborted)));
        }
    }

    #[test]
    fn non_positive_count_rejected_on_every_rank() {
        let out = Runtime::new(3)
            .unwrap()
            .run(|world| Ok(run_estimator(&world, || Ok(0))))
            .unwrap();
        for outcome in &out {
            assert!(matches!(outcome, Err(Error::InvalidPartitionCount(0))));
        }
    }
}
