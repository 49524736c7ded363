//! The per-worker visibility pipeline and its whole-group driver.

use std::time::{Duration, Instant};

use crate::classify::{classify, VisibilityFlag};
use crate::collect::{gather_flags, CollectMode};
use crate::comm::Communicator;
use crate::error::{Error, InputError, Result};
use crate::partition::assignment;
use crate::scanner::{sight_angle, LocalScan, NEG_INF_ANGLE};
use crate::{ReduceOp, World};

/// Settings of a visibility run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Number of workers (`p`)
    pub workers: usize,
    /// Rank that assembles the output
    pub root: i32,
    /// How flags travel to the root
    pub collect: CollectMode,
}

impl Options {
    /// `workers` workers, root 0, batched collection.
    pub fn with_workers(workers: usize) -> Self {
        Options {
            workers,
            ..Options::default()
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            workers: 1,
            root: 0,
            collect: CollectMode::default(),
        }
    }
}

/// Result of a visibility run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// One flag per sample, in index order
    pub flags: Vec<VisibilityFlag>,
    /// Local work plus exchange time of each rank, in rank order
    pub timings: Vec<Duration>,
}

/// Run the pipeline on one worker.
///
/// Partitions the samples, scans the local chunk, exchanges chunk maxima with
/// an exclusive max-scan, classifies the chunk and gathers all flags on
/// `root`. Returns `Some(flags)` on the root, `None` elsewhere, together with
/// the time this worker spent between partitioning and classification.
pub fn worker_visibility(
    comm: &Communicator,
    altitudes: &[i64],
    root: i32,
    mode: CollectMode,
) -> Result<(Option<Vec<VisibilityFlag>>, Duration)> {
    if altitudes.is_empty() {
        return Err(InputError::Empty.into());
    }

    let started = Instant::now();
    let rank = comm.rank();
    let chunk = assignment(altitudes.len(), comm.size() as usize, rank as usize);
    tracing::debug!(rank, start = chunk.start, len = chunk.len, "chunk assigned");

    let scan = LocalScan::new(altitudes, chunk);
    let cross_worker_max = comm.exscan_scalar(scan.chunk_max(), ReduceOp::Max)?;
    tracing::debug!(rank, chunk_max = scan.chunk_max(), cross_worker_max, "prefix maximum exchanged");

    let mut local = Vec::with_capacity(chunk.len + 1);
    if rank == 0 {
        local.push(VisibilityFlag::Observer);
    }
    local.extend(classify(&scan, cross_worker_max));
    let elapsed = started.elapsed();

    let flags = gather_flags(comm, &local, altitudes.len(), root, mode)?;
    Ok((flags, elapsed))
}

/// Classify `altitudes` with a group of `options.workers` workers.
///
/// Every worker reads the same immutable altitude slice, as if each had been
/// handed the identical program input.
///
/// ```
/// use ferrovis::{render, visibility, Options};
///
/// let report = visibility(&[0, 1, 3, 6, 10], &Options::with_workers(1))?;
/// assert_eq!(render(&report.flags), "_,v,v,v,v");
///
/// // A constant slope hides everything behind the first sample.
/// let report = visibility(&[1, 2, 3, 4, 5], &Options::with_workers(2))?;
/// assert_eq!(render(&report.flags), "_,v,u,u,u");
/// assert_eq!(report.timings.len(), 1);
/// # Ok::<(), ferrovis::Error>(())
/// ```
pub fn visibility(altitudes: &[i64], options: &Options) -> Result<Report> {
    if altitudes.is_empty() {
        return Err(InputError::Empty.into());
    }
    let world = World::new(options.workers)?;
    if !(0..world.size()).contains(&options.root) {
        return Err(Error::InvalidRank(options.root));
    }

    tracing::info!(
        samples = altitudes.len(),
        workers = world.size(),
        collect = %options.collect,
        "classifying"
    );
    let outcomes = world.run(|comm| worker_visibility(&comm, altitudes, options.root, options.collect))?;

    let mut flags = None;
    let mut timings = Vec::with_capacity(outcomes.len());
    for (gathered, elapsed) in outcomes {
        if gathered.is_some() {
            flags = gathered;
        }
        timings.push(elapsed);
    }
    let flags = flags.ok_or_else(|| Error::Internal("root returned no flags".into()))?;

    Ok(Report { flags, timings })
}

/// Single-pass sequential classification, the reference for the distributed run.
pub fn sequential_visibility(altitudes: &[i64]) -> Vec<VisibilityFlag> {
    if altitudes.is_empty() {
        return Vec::new();
    }

    let mut flags = Vec::with_capacity(altitudes.len());
    flags.push(VisibilityFlag::Observer);
    let mut highest = NEG_INF_ANGLE;
    for index in 1..altitudes.len() {
        let angle = sight_angle(altitudes, index);
        flags.push(if angle > highest {
            VisibilityFlag::Visible
        } else {
            VisibilityFlag::Hidden
        });
        highest = highest.max(angle);
    }
    flags
}
