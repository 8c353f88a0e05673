//! Worker-count hints left in the environment by a job launcher.
//!
//! These functions return `None` if the variable is not set or does not parse
//! (e.g., when started by hand rather than under a scheduler).
//!
//! # Environment Variables
//!
//! | Function | Variable | Description |
//! |----------|----------|-------------|
//! | `world_size()` | `SLURM_NTASKS`, `OMPI_COMM_WORLD_SIZE`, `PMI_SIZE` | Tasks requested from the launcher |
//! | `cpus_per_task()` | `SLURM_CPUS_PER_TASK` | CPUs allocated per task |

use std::env;
use std::thread;

/// Variables naming the total task count, in order of preference.
const WORLD_SIZE_VARS: [&str; 3] = ["SLURM_NTASKS", "OMPI_COMM_WORLD_SIZE", "PMI_SIZE"];

fn positive_var(name: &str) -> Option<i32> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n: &i32| n > 0)
}

/// Total task count requested from SLURM, Open MPI or an MPICH-style PMI launcher.
pub fn world_size() -> Option<i32> {
    WORLD_SIZE_VARS.iter().find_map(|name| positive_var(name))
}

/// Get the number of CPUs per task.
pub fn cpus_per_task() -> Option<i32> {
    positive_var("SLURM_CPUS_PER_TASK")
}

/// Hardware threads available to this process, at least 1.
pub fn available_cpus() -> i32 {
    thread::available_parallelism()
        .map(|n| i32::try_from(n.get()).unwrap_or(i32::MAX))
        .unwrap_or(1)
}

/// Worker count when none is given explicitly.
///
/// Launcher task count first, then `SLURM_CPUS_PER_TASK`, then the number of
/// available CPUs.
pub fn default_workers() -> i32 {
    world_size()
        .or_else(cpus_per_task)
        .unwrap_or_else(available_cpus)
}
