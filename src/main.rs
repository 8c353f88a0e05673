//! ferropi CLI - estimate pi with the parallel composite trapezoidal rule.
//!
//! Run with: cargo run --release -- --workers 4

use clap::Parser;
use ferropi::config::Config;
use ferropi::estimator::{acquire_partitions, run_estimator};
use ferropi::report::{result_line, PROMPT};
use ferropi::{Error, Result, Runtime};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cfg = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: &Config) -> Result<()> {
    let runtime = Runtime::new(cfg.worker_count())?;
    let preset = cfg.partitions;

    let estimates = runtime.run(|world| {
        let estimate = run_estimator(&world, || {
            let mut stdout = io::stdout().lock();
            match preset {
                Some(n) => {
                    writeln!(stdout, "{PROMPT}")?;
                    stdout.flush()?;
                    Ok(n)
                }
                None => acquire_partitions(&mut io::stdin().lock(), &mut stdout),
            }
        })?;
        if let Some(estimate) = &estimate {
            println!("{}", result_line(estimate));
        }
        Ok(estimate)
    })?;

    let estimate = estimates
        .into_iter()
        .flatten()
        .next()
        .ok_or_else(|| Error::Internal("coordinator produced no estimate".into()))?;

    tracing::info!(
        partitions = estimate.partitions,
        workers = estimate.workers,
        abs_error = estimate.abs_error(),
        elapsed = estimate.elapsed,
        compute_min = estimate.compute_min,
        compute_max = estimate.compute_max,
        "run complete"
    );
    Ok(())
}
