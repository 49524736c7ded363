//! Domain decomposition of the sample array across ranks.

use std::ops::Range;

/// The contiguous run of sample indices owned by one rank.
///
/// Index 0 (the observer) is never part of a chunk; it is reported by rank 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkAssignment {
    /// First owned sample index
    pub start: usize,
    /// Number of owned samples (zero for an idle rank)
    pub len: usize,
}

impl ChunkAssignment {
    /// One past the last owned index.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Owned indices in ascending order.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// `true` for an idle rank.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Chunk of `rank` when `samples` values are split over `size` ranks.
///
/// The first `samples % size` ranks get one extra element; rank 0 then gives
/// up index 0 to the observer.
///
/// ```
/// use ferrovis::{assignment, ChunkAssignment};
///
/// assert_eq!(assignment(10, 3, 0), ChunkAssignment { start: 1, len: 3 });
/// assert_eq!(assignment(10, 3, 1), ChunkAssignment { start: 4, len: 3 });
/// assert_eq!(assignment(10, 3, 2), ChunkAssignment { start: 7, len: 3 });
/// ```
pub fn assignment(samples: usize, size: usize, rank: usize) -> ChunkAssignment {
    debug_assert!(rank < size, "rank {rank} outside a group of {size}");
    let base = samples / size;
    let extra = samples % size;

    let mut chunk = ChunkAssignment {
        start: rank * base + rank.min(extra),
        len: base + usize::from(rank < extra),
    };
    if rank == 0 {
        chunk.start += 1;
        chunk.len = chunk.len.saturating_sub(1);
    }
    chunk
}

/// Chunks of every rank, in rank order.
pub fn assignments(samples: usize, size: usize) -> Vec<ChunkAssignment> {
    (0..size).map(|rank| assignment(samples, size, rank)).collect()
}
