//! Tree-shaped prefix reductions over a [`Communicator`].
//!
//! The exclusive scan is a two-phase exchange on an implicit binary tree laid
//! over the ranks. Rank `r` sits at tree position `q = r + (P - p)`, where `P`
//! is the smallest power of two not below the group size `p`; positions below
//! `P - p` are virtual, hold the identity and never communicate. The last rank
//! is therefore always the root, and for power-of-two groups `q == r`.
//!
//! At level `j` a position takes part iff `(q + 1) % 2^j == 0`. It is an
//! *accumulator* if additionally `(q + 1) % 2^(j + 1) == 0` and partners with
//! `r - 2^j`; otherwise it is a *contributor* and partners with `r + 2^j`.
//!
//! - Up-sweep (`j = 0..L`): contributors send their value, accumulators fold it in.
//! - The root (rank `p - 1`) resets its value to the identity.
//! - Down-sweep (`j = L..0`): an accumulator sends its value to its partner,
//!   gets the partner's up-sweep value back and folds it in; a contributor
//!   receives, returns its own value and adopts what it received.
//!
//! Each sweep takes exactly `L = ceil(log2 p)` rounds.

use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::Result;
use crate::ReduceOp;

/// Base tag of up-sweep messages; the level is added to it.
const UPSWEEP_TAG: i32 = 0x5c00;
/// Base tag of down-sweep messages; the level is added to it.
const DOWNSWEEP_TAG: i32 = 0x5d00;

/// What a rank does at one tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Receives in the up-sweep, sends first in the down-sweep.
    Accumulator,
    /// Sends in the up-sweep, receives first in the down-sweep.
    Contributor,
}

/// A rank's part in one level of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Role at this level
    pub role: Role,
    /// Rank exchanged with, or `None` when the partner position is virtual
    pub partner: Option<i32>,
}

/// Shape of the exchange tree for a group of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLayout {
    size: i32,
    padding: i32,
    levels: u32,
}

impl TreeLayout {
    /// Layout for a group of `size` ranks (`size >= 1`).
    pub fn new(size: i32) -> Self {
        let span = (size.max(1) as u32).next_power_of_two();
        TreeLayout {
            size,
            padding: span as i32 - size,
            levels: span.trailing_zeros(),
        }
    }

    /// Rounds per sweep: `ceil(log2 size)`.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Tree position of `rank`.
    pub fn position(&self, rank: i32) -> i32 {
        rank + self.padding
    }

    /// What `rank` does at `level`, or `None` if it sits this level out.
    pub fn step(&self, rank: i32, level: u32) -> Option<Step> {
        let stride = 1i32 << level;
        let slot = self.position(rank) + 1;
        if slot % stride != 0 {
            return None;
        }

        let (role, partner) = if slot % (stride * 2) == 0 {
            (Role::Accumulator, rank - stride)
        } else {
            (Role::Contributor, rank + stride)
        };
        let partner = (0..self.size).contains(&partner).then_some(partner);
        Some(Step { role, partner })
    }
}

impl Communicator {
    /// Exclusive prefix reduction of one value per rank.
    ///
    /// Rank `r` gets `op` folded over the values of ranks `0..r`; rank 0 gets
    /// `T::identity(op)`. Every rank of the group must call this with the same
    /// `op`.
    ///
    /// # Example
    ///
    /// ```
    /// use ferrovis::{ReduceOp, World};
    ///
    /// let maxima = World::new(3)?.run(|comm| {
    ///     let value = [4.0f64, 1.0, 9.0][comm.rank() as usize];
    ///     comm.exscan_scalar(value, ReduceOp::Max)
    /// })?;
    /// assert_eq!(maxima, vec![f64::NEG_INFINITY, 4.0, 4.0]);
    /// # Ok::<(), ferrovis::Error>(())
    /// ```
    pub fn exscan_scalar<T: Datatype>(&self, value: T, op: ReduceOp) -> Result<T> {
        let layout = TreeLayout::new(self.size());
        let rank = self.rank();
        let mut carried = value;

        for level in 0..layout.levels() {
            let Some(Step {
                role,
                partner: Some(partner),
            }) = layout.step(rank, level)
            else {
                continue;
            };
            let tag = UPSWEEP_TAG + level as i32;
            match role {
                Role::Accumulator => {
                    let incoming = self.recv_scalar::<T>(partner, tag)?;
                    carried = T::reduce(op, incoming, carried);
                }
                Role::Contributor => self.send_scalar(carried, partner, tag)?,
            }
            tracing::trace!(rank, level, ?role, partner, value = ?carried, "up-sweep");
        }

        if rank == self.size() - 1 {
            carried = T::identity(op);
        }

        for level in (0..layout.levels()).rev() {
            let Some(Step {
                role,
                partner: Some(partner),
            }) = layout.step(rank, level)
            else {
                continue;
            };
            let tag = DOWNSWEEP_TAG + level as i32;
            match role {
                Role::Accumulator => {
                    self.send_scalar(carried, partner, tag)?;
                    let incoming = self.recv_scalar::<T>(partner, tag)?;
                    carried = T::reduce(op, carried, incoming);
                }
                Role::Contributor => {
                    let incoming = self.recv_scalar::<T>(partner, tag)?;
                    self.send_scalar(carried, partner, tag)?;
                    carried = incoming;
                }
            }
            tracing::trace!(rank, level, ?role, partner, value = ?carried, "down-sweep");
        }

        Ok(carried)
    }

    /// Inclusive prefix reduction: `op` over the values of ranks `0..=r`.
    pub fn scan_scalar<T: Datatype>(&self, value: T, op: ReduceOp) -> Result<T> {
        let before = self.exscan_scalar(value, op)?;
        Ok(T::reduce(op, before, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::World;

    #[test]
    fn levels_are_ceil_log2() {
        let expected = [(1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (16, 4)];
        for (size, levels) in expected {
            assert_eq!(TreeLayout::new(size).levels(), levels, "size {size}");
        }
    }

    #[test]
    fn power_of_two_layout_uses_rank_plus_one() {
        let layout = TreeLayout::new(8);
        for rank in 0..8 {
            assert_eq!(layout.position(rank), rank);
            for level in 0..3 {
                let participates = (rank + 1) % (1 << level) == 0;
                assert_eq!(layout.step(rank, level).is_some(), participates);
            }
        }
        assert_eq!(
            layout.step(7, 2),
            Some(Step {
                role: Role::Accumulator,
                partner: Some(3)
            })
        );
        assert_eq!(
            layout.step(3, 2),
            Some(Step {
                role: Role::Contributor,
                partner: Some(7)
            })
        );
        assert_eq!(layout.step(2, 1), None);
    }

    #[test]
    fn padded_layout_never_targets_missing_ranks() {
        for size in 1..=33 {
            let layout = TreeLayout::new(size);
            for rank in 0..size {
                for level in 0..layout.levels() {
                    if let Some(step) = layout.step(rank, level) {
                        match (step.role, step.partner) {
                            (Role::Contributor, None) => {
                                panic!("contributor {rank} of {size} lost its partner at {level}")
                            }
                            (_, Some(partner)) => assert!((0..size).contains(&partner)),
                            (Role::Accumulator, None) => {}
                        }
                    }
                }
            }
            // The last rank is the root: it accumulates at every level.
            for level in 0..layout.levels() {
                let root = layout.step(size - 1, level).unwrap();
                assert_eq!(root.role, Role::Accumulator);
            }
        }
    }

    #[test]
    fn partners_are_symmetric() {
        for size in 1..=20 {
            let layout = TreeLayout::new(size);
            for rank in 0..size {
                for level in 0..layout.levels() {
                    if let Some(Step {
                        partner: Some(partner),
                        role,
                    }) = layout.step(rank, level)
                    {
                        let back = layout.step(partner, level).unwrap();
                        assert_eq!(back.partner, Some(rank));
                        assert_ne!(back.role, role);
                    }
                }
            }
        }
    }

    #[test]
    fn single_rank_gets_identity() {
        let out = World::new(1)
            .unwrap()
            .run(|comm| comm.exscan_scalar(0.7f64, ReduceOp::Max))
            .unwrap();
        assert_eq!(out, vec![f64::NEG_INFINITY]);
    }

    #[test]
    fn exclusive_sum_matches_serial_for_every_size() {
        for size in 1..=12usize {
            let out = World::new(size)
                .unwrap()
                .run(|comm| comm.exscan_scalar(i64::from(comm.rank()) + 1, ReduceOp::Sum))
                .unwrap();
            let expected: Vec<i64> = (0..size as i64).map(|r| r * (r + 1) / 2).collect();
            assert_eq!(out, expected, "size {size}");
        }
    }

    #[test]
    fn inclusive_max_of_descending_values() {
        let size = 6;
        let out = World::new(size)
            .unwrap()
            .run(|comm| comm.scan_scalar((comm.size() - comm.rank()) as f64, ReduceOp::Max))
            .unwrap();
        assert_eq!(out, vec![size as f64; size]);
    }
}
