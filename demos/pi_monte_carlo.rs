//! Monte Carlo Pi Estimation - the stochastic counterpart of the trapezoid run.
//!
//! Each rank samples points in the unit square and counts how many fall inside
//! the quarter circle; the counts are sum-reduced to rank 0.
//!
//! Run with: cargo run --release --example pi_monte_carlo -- 4

use ferropi::estimator::COORDINATOR;
use ferropi::quadrature::WorkerIdentity;
use ferropi::{ReduceOp, Result, Runtime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

const TOTAL_SAMPLES: i64 = 20_000_000;

fn main() -> Result<()> {
    let size = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(ferropi::launcher::default_workers);

    Runtime::new(size)?.run(|world| {
        let me = WorkerIdentity::of(&world)?;
        let samples = world.broadcast_scalar(TOTAL_SAMPLES, COORDINATOR)?;
        let block = me.subinterval(samples);

        let start = Runtime::wtime();
        // Each rank gets a different seed based on rank
        let mut rng = StdRng::seed_from_u64(0x5eed ^ me.rank as u64);
        let mut inside: u64 = 0;
        for _ in block {
            let x: f64 = rng.gen_range(0.0..1.0);
            let y: f64 = rng.gen_range(0.0..1.0);
            if x * x + y * y <= 1.0 {
                inside += 1;
            }
        }
        let elapsed = Runtime::wtime() - start;

        let total_inside = world.reduce_scalar(inside, ReduceOp::Sum, COORDINATOR)?;
        let max_time = world.reduce_scalar(elapsed, ReduceOp::Max, COORDINATOR)?;

        if let (Some(total_inside), Some(max_time)) = (total_inside, max_time) {
            // π = 4 * (points inside circle) / (total points)
            let estimate = 4.0 * total_inside as f64 / samples as f64;
            println!("Workers:      {}", me.size);
            println!("Samples:      {samples}");
            println!("Estimated π:  {estimate:.10}");
            println!("Error:        {:.10}", (estimate - PI).abs());
            println!("Slowest rank: {max_time:.4}s");
        }
        Ok(())
    })?;

    Ok(())
}
