//! # ferrovis
//!
//! Line-of-sight visibility over a fixed SPMD worker group.
//!
//! Given terrain altitudes sampled along a line from an observer standing on
//! sample 0, a sample is visible iff its sight angle exceeds the angle of every
//! sample between it and the observer. The crate splits the samples across `p`
//! workers, computes a local running maximum per chunk, exchanges chunk maxima
//! with a binary-tree exclusive prefix scan (`O(log p)` message rounds) and
//! classifies each sample locally.
//!
//! The workers run on a small message-passing runtime:
//! - [`World`] launches `p` workers, one thread each, with no shared mutable state
//! - [`Communicator`] offers blocking, tagged point-to-point `send`/`recv`
//! - [`Communicator::exscan_scalar`] is the tree prefix reduction
//! - All communication is generic over [`Datatype`]:
//!   `f32`, `f64`, `i32`, `i64`, `u8`, `u32`, `u64`
//!
//! ## Quick Start
//!
//! ```
//! use ferrovis::{parse_altitudes, render, visibility, Options};
//!
//! let altitudes = parse_altitudes("10,1,20,3,40")?;
//! let report = visibility(&altitudes, &Options::with_workers(2))?;
//! assert_eq!(render(&report.flags), "_,v,v,u,v");
//! # Ok::<(), ferrovis::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `debug` | Trace every message sent and received |

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

mod classify;
mod collect;
mod comm;
mod datatype;
pub mod env;
mod error;
mod input;
mod partition;
mod pipeline;
mod scan;
mod scanner;
mod status;

pub use classify::{classify, render, VisibilityFlag};
pub use collect::{gather_flags, CollectMode};
pub use comm::{Communicator, ANY_TAG};
pub use datatype::{Datatype, DatatypeTag};
pub use error::{Error, InputError, MalformedField, Result};
pub use input::parse_altitudes;
pub use partition::{assignment, assignments, ChunkAssignment};
pub use pipeline::{sequential_visibility, visibility, worker_visibility, Options, Report};
pub use scan::{Role, Step, TreeLayout};
pub use scanner::{sight_angle, LocalScan, NEG_INF_ANGLE};
pub use status::Status;

use std::thread;

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

/// A fixed-size worker group.
///
/// `World` plays the role of the process launcher: [`run`](Self::run) starts
/// exactly `size` workers, each holding a [`Communicator`] for its own rank,
/// and waits for all of them. The group size never changes during a run.
///
/// # Example
///
/// ```
/// use ferrovis::{ReduceOp, World};
///
/// let world = World::new(4)?;
/// let sums = world.run(|comm| comm.scan_scalar(1.0f64, ReduceOp::Sum))?;
/// assert_eq!(sums, vec![1.0, 2.0, 3.0, 4.0]);
/// # Ok::<(), ferrovis::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct World {
    size: i32,
}

impl World {
    /// Create a group of `size` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSize`] if `size` is zero or does not fit a rank.
    pub fn new(size: usize) -> Result<Self> {
        match i32::try_from(size) {
            Ok(size) if size > 0 => Ok(World { size }),
            _ => Err(Error::InvalidSize(size)),
        }
    }

    /// Number of workers in the group.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Run `worker` once on every rank and collect the results in rank order.
    ///
    /// Every worker gets its own [`Communicator`]; all of them run concurrently
    /// on named threads (`rank-<r>`). When any worker fails, the error of the
    /// lowest failing rank is returned, preferring a root cause over the
    /// [`Error::PeerDisconnected`] it triggers on other ranks.
    pub fn run<T, F>(&self, worker: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Communicator) -> Result<T> + Sync,
    {
        let worker = &worker;
        let outcomes = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size as usize);
            for comm in Communicator::mesh(self.size) {
                let rank = comm.rank();
                let handle = thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || {
                        let span = tracing::debug_span!("worker", rank);
                        let _guard = span.enter();
                        worker(comm)
                    })
                    .map_err(|source| Error::Spawn { rank, source })?;
                handles.push((rank, handle));
            }

            Ok::<_, Error>(
                handles
                    .into_iter()
                    .map(|(rank, handle)| match handle.join() {
                        Ok(outcome) => outcome,
                        Err(_) => Err(Error::WorkerPanicked(rank)),
                    })
                    .collect::<Vec<_>>(),
            )
        })?;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failure: Option<Error> = None;
        for (rank, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(value) => results.push(value),
                Err(err) => {
                    tracing::debug!(rank, error = %err, "worker failed");
                    let replace = match &failure {
                        None => true,
                        Some(Error::PeerDisconnected(_)) => {
                            !matches!(err, Error::PeerDisconnected(_))
                        }
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(err);
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_rejects_empty_group() {
        assert!(matches!(World::new(0), Err(Error::InvalidSize(0))));
        assert_eq!(World::new(3).unwrap().size(), 3);
    }

    #[test]
    fn run_returns_results_in_rank_order() {
        let world = World::new(5).unwrap();
        let ranks = world.run(|comm| Ok((comm.rank(), comm.size()))).unwrap();
        assert_eq!(ranks, vec![(0, 5), (1, 5), (2, 5), (3, 5), (4, 5)]);
    }

    #[test]
    fn run_reports_root_cause_over_disconnects() {
        let world = World::new(3).unwrap();
        let err = world
            .run(|comm| {
                if comm.rank() == 2 {
                    return Err(Error::Internal("rank 2 gave up".into()));
                }
                // Ranks 0 and 1 wait on rank 2, which never sends.
                comm.recv_scalar::<f64>(2, 0).map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Internal(msg) if msg == "rank 2 gave up"));
    }

    #[test]
    fn run_reports_panicking_worker() {
        let world = World::new(2).unwrap();
        let err = world
            .run(|comm| {
                if comm.rank() == 1 {
                    panic!("boom");
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::WorkerPanicked(1)));
    }
}
