//! Environment helpers for sizing the worker group.
//!
//! Variables that are unset or not a positive integer are ignored.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `FERROVIS_WORKERS` | Explicit worker count |
//! | `SLURM_NTASKS` | Tasks allocated to the enclosing SLURM job |
//! | `SLURM_JOB_ID` | Set inside a SLURM job |

use std::env;
use std::num::NonZeroUsize;
use std::thread;

/// Variable naming the worker count explicitly.
pub const WORKERS_VAR: &str = "FERROVIS_WORKERS";

/// Check if running under SLURM job scheduler.
pub fn is_slurm_job() -> bool {
    env::var("SLURM_JOB_ID").is_ok()
}

/// Worker count to use when none is given on the command line.
///
/// `FERROVIS_WORKERS`, then `SLURM_NTASKS`, then the available parallelism of
/// this machine, then 1.
pub fn default_workers() -> usize {
    resolve_workers(|name| env::var(name).ok(), available_parallelism())
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

fn positive(value: Option<String>) -> Option<usize> {
    value
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

fn resolve_workers(lookup: impl Fn(&str) -> Option<String>, fallback: usize) -> usize {
    positive(lookup(WORKERS_VAR))
        .or_else(|| positive(lookup("SLURM_NTASKS")))
        .unwrap_or(fallback.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn explicit_count_wins() {
        let vars = lookup(&[(WORKERS_VAR, "6"), ("SLURM_NTASKS", "32")]);
        assert_eq!(resolve_workers(vars, 8), 6);
    }

    #[test]
    fn slurm_tasks_next() {
        let vars = lookup(&[("SLURM_NTASKS", "32")]);
        assert_eq!(resolve_workers(vars, 8), 32);
    }

    #[test]
    fn invalid_values_fall_through() {
        let vars = lookup(&[(WORKERS_VAR, "0"), ("SLURM_NTASKS", "many")]);
        assert_eq!(resolve_workers(vars, 8), 8);
        assert_eq!(resolve_workers(lookup(&[]), 0), 1);
    }

    #[test]
    fn not_in_slurm_by_default() {
        // CI runners are not SLURM jobs; skip the check on a cluster.
        if std::env::var("SLURM_JOB_ID").is_err() {
            assert!(!is_slurm_job());
        }
        assert!(default_workers() >= 1);
    }
}
