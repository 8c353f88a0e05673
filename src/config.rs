//! Command-line and environment configuration for the `ferropi` binary.

use crate::launcher;
use clap::Parser;

/// Estimate pi with the composite trapezoidal rule, split across workers.
///
/// The coordinator prompts for the number of partitions on stdin unless
/// `--partitions` is given, broadcasts it to every worker, and sum-reduces
/// the partial integrals.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "ferropi")]
#[command(version, long_about = None)]
pub struct Config {
    /// Number of workers. Defaults to the launcher's task count, then the available CPUs.
    #[arg(short = 'n', long, env = "FERROPI_WORKERS", value_parser = clap::value_parser!(i32).range(1..))]
    pub workers: Option<i32>,

    /// Number of partitions. Read from stdin when absent.
    #[arg(short, long, env = "FERROPI_PARTITIONS", allow_negative_numbers = true)]
    pub partitions: Option<i64>,

    /// Log per-run diagnostics (error against pi, compute times) to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Worker count to start the runtime with.
    pub fn worker_count(&self) -> i32 {
        self.workers.unwrap_or_else(launcher::default_workers)
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags() {
        let cfg = Config::try_parse_from(["ferropi", "-n", "4", "-p", "1000", "-v"]).unwrap();
        assert_eq!(cfg.workers, Some(4));
        assert_eq!(cfg.worker_count(), 4);
        assert_eq!(cfg.partitions, Some(1000));
        assert!(cfg.verbose);
        assert_eq!(cfg.default_log_filter(), "debug");
    }

    #[test]
    fn long_flags() {
        let cfg = Config::try_parse_from(["ferropi", "--workers", "2", "--partitions", "-5"]).unwrap();
        assert_eq!(cfg.workers, Some(2));
        assert_eq!(cfg.partitions, Some(-5));
        assert_eq!(cfg.default_log_filter(), "warn");
    }

    #[test]
    fn about_comes_from_doc_comment() {
        use clap::CommandFactory;
        let about = Config::command().get_about().map(ToString::to_string);
        assert_eq!(
            about.as_deref(),
            Some("Estimate pi with the composite trapezoidal rule, split across workers.")
        );
    }

    #[test]
    fn zero_workers_rejected_at_parse() {
        assert!(Config::try_parse_from(["ferropi", "--workers", "0"]).is_err());
    }

    #[test]
    fn non_numeric_partitions_rejected() {
        assert!(Config::try_parse_from(["ferropi", "--partitions", "ten"]).is_err());
    }
}
