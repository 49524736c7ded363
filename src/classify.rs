//! Visibility flags and the per-chunk classification.

use std::fmt;

use crate::scanner::LocalScan;

/// Visibility of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityFlag {
    /// Sample 0, where the observer stands
    Observer,
    /// Seen above every sample in front of it
    Visible,
    /// Hidden behind an earlier sample
    Hidden,
}

impl VisibilityFlag {
    /// Output character: `_`, `v` or `u`.
    pub fn as_char(self) -> char {
        match self {
            VisibilityFlag::Observer => '_',
            VisibilityFlag::Visible => 'v',
            VisibilityFlag::Hidden => 'u',
        }
    }

    /// Single-byte wire form used by the collector.
    pub fn to_byte(self) -> u8 {
        self.as_char() as u8
    }

    /// Inverse of [`to_byte`](Self::to_byte).
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'_' => Some(VisibilityFlag::Observer),
            b'v' => Some(VisibilityFlag::Visible),
            b'u' => Some(VisibilityFlag::Hidden),
            _ => None,
        }
    }
}

impl fmt::Display for VisibilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Classify every sample of a scanned chunk.
///
/// `cross_worker_max` is the largest angle owned by lower ranks. A sample is
/// visible iff its angle is strictly greater than both that and the running
/// maximum of the samples before it in the chunk.
pub fn classify(scan: &LocalScan, cross_worker_max: f64) -> Vec<VisibilityFlag> {
    scan.angles()
        .iter()
        .enumerate()
        .map(|(offset, &angle)| {
            let ahead = scan.max_before(offset).max(cross_worker_max);
            if angle > ahead {
                VisibilityFlag::Visible
            } else {
                VisibilityFlag::Hidden
            }
        })
        .collect()
}

/// Comma-separated output line, e.g. `_,v,u`.
pub fn render(flags: &[VisibilityFlag]) -> String {
    let mut line = String::with_capacity(flags.len() * 2);
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push(flag.as_char());
    }
    line
}
