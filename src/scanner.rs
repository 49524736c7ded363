//! Per-chunk sight angles and running maxima.

use crate::partition::ChunkAssignment;

/// Angle below every attainable sight angle (`atan` stays within `(-pi/2, pi/2)`).
///
/// Seeds the running maximum before a chunk's first sample and is the
/// cross-worker maximum of rank 0.
pub const NEG_INF_ANGLE: f64 = f64::NEG_INFINITY;

/// Sight angle of sample `index` (`index >= 1`) seen from sample 0.
pub fn sight_angle(altitudes: &[i64], index: usize) -> f64 {
    debug_assert!(index >= 1, "the observer has no sight angle");
    let rise = altitudes[index] as f64 - altitudes[0] as f64;
    (rise / index as f64).atan()
}

/// Angles and running maxima of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalScan {
    chunk: ChunkAssignment,
    angles: Vec<f64>,
    running_max: Vec<f64>,
}

impl LocalScan {
    /// Scan `chunk` of `altitudes` in ascending index order.
    pub fn new(altitudes: &[i64], chunk: ChunkAssignment) -> Self {
        let angles: Vec<f64> = chunk.range().map(|i| sight_angle(altitudes, i)).collect();
        let running_max = angles
            .iter()
            .scan(NEG_INF_ANGLE, |max, &angle| {
                *max = max.max(angle);
                Some(*max)
            })
            .collect();

        LocalScan {
            chunk,
            angles,
            running_max,
        }
    }

    /// The scanned chunk.
    pub fn chunk(&self) -> ChunkAssignment {
        self.chunk
    }

    /// Sight angle of every owned sample.
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Running maximum at every owned sample, within the chunk.
    pub fn running_max(&self) -> &[f64] {
        &self.running_max
    }

    /// Running maximum just before the `offset`-th owned sample.
    pub fn max_before(&self, offset: usize) -> f64 {
        offset
            .checked_sub(1)
            .map_or(NEG_INF_ANGLE, |prev| self.running_max[prev])
    }

    /// This chunk's contribution to the exchange: the maximum over the whole chunk.
    pub fn chunk_max(&self) -> f64 {
        self.running_max.last().copied().unwrap_or(NEG_INF_ANGLE)
    }
}
