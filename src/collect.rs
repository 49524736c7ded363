//! Order-preserving gather of visibility flags to one coordinating rank.
//!
//! The root walks the ranks in ascending order, taking its own flags in place
//! and draining every other rank completely before moving on. Because chunks
//! are contiguous and ascend with rank, this reproduces global index order
//! without any sorting.

use std::fmt;
use std::str::FromStr;

use crate::classify::VisibilityFlag;
use crate::comm::{Communicator, ANY_TAG};
use crate::error::{Error, Result};
use crate::partition::assignment;

/// Tag of a single streamed flag.
const FLAG_TAG: i32 = 0x7f00;
/// Tag of the empty message closing a rank's stream.
const END_TAG: i32 = 0x7f01;
/// Tag of a whole-chunk batch.
const BATCH_TAG: i32 = 0x7f02;

/// How flags travel to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectMode {
    /// One message per flag, then an empty end-of-stream message
    Stream,
    /// One message per rank holding its whole chunk
    #[default]
    Batch,
}

impl fmt::Display for CollectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectMode::Stream => "stream",
            CollectMode::Batch => "batch",
        })
    }
}

impl FromStr for CollectMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(CollectMode::Stream),
            "batch" => Ok(CollectMode::Batch),
            other => Err(format!("unknown collect mode {other:?} (expected stream or batch)")),
        }
    }
}

/// Number of flags `rank` contributes: its chunk, plus the observer on rank 0.
fn contribution_len(samples: usize, size: i32, rank: i32) -> usize {
    let chunk = assignment(samples, size as usize, rank as usize);
    chunk.len + usize::from(rank == 0)
}

fn decode(byte: u8, source: i32) -> Result<VisibilityFlag> {
    VisibilityFlag::from_byte(byte)
        .ok_or_else(|| Error::protocol(source, format!("invalid flag byte {byte:#04x}")))
}

/// Gather every rank's flags on `root`, in sample order.
///
/// `local` is this rank's contribution in index order (rank 0 includes the
/// observer flag first). Every rank must call this with the same `samples`,
/// `root` and `mode`. Returns `Some(all_flags)` on the root and `None`
/// elsewhere.
pub fn gather_flags(
    comm: &Communicator,
    local: &[VisibilityFlag],
    samples: usize,
    root: i32,
    mode: CollectMode,
) -> Result<Option<Vec<VisibilityFlag>>> {
    if !(0..comm.size()).contains(&root) {
        return Err(Error::InvalidRank(root));
    }

    if comm.rank() != root {
        match mode {
            CollectMode::Stream => {
                for flag in local {
                    comm.send_scalar(flag.to_byte(), root, FLAG_TAG)?;
                }
                comm.send::<u8>(&[], root, END_TAG)?;
            }
            CollectMode::Batch => {
                let bytes: Vec<u8> = local.iter().map(|flag| flag.to_byte()).collect();
                comm.send(&bytes, root, BATCH_TAG)?;
            }
        }
        return Ok(None);
    }

    let mut flags = Vec::with_capacity(samples);
    for source in 0..comm.size() {
        let expected = contribution_len(samples, comm.size(), source);
        let received = match mode {
            _ if source == root => {
                flags.extend_from_slice(local);
                local.len()
            }
            CollectMode::Stream => drain_stream(comm, source, &mut flags)?,
            CollectMode::Batch => {
                let mut bytes = vec![0u8; expected];
                let status = comm.recv(&mut bytes, source, BATCH_TAG)?;
                for &byte in &bytes[..status.count as usize] {
                    flags.push(decode(byte, source)?);
                }
                status.count as usize
            }
        };
        if received != expected {
            return Err(Error::protocol(
                source,
                format!("expected {expected} flags, received {received}"),
            ));
        }
        tracing::trace!(source, received, "collected");
    }

    Ok(Some(flags))
}

/// Read single-flag messages from `source` up to its end marker.
fn drain_stream(comm: &Communicator, source: i32, flags: &mut Vec<VisibilityFlag>) -> Result<usize> {
    let mut received = 0;
    loop {
        let mut byte = [0u8; 1];
        let status = comm.recv(&mut byte, source, ANY_TAG)?;
        match (status.tag, status.count) {
            (END_TAG, 0) => return Ok(received),
            (FLAG_TAG, 1) => {
                flags.push(decode(byte[0], source)?);
                received += 1;
            }
            (tag, count) => {
                return Err(Error::protocol(
                    source,
                    format!("unexpected message (tag {tag}, {count} values) in flag stream"),
                ))
            }
        }
    }
}
