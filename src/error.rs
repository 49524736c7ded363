//! Error types for ferrovis

use thiserror::Error;

use crate::datatype::DatatypeTag;

/// Result type for runtime and pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the worker runtime and the visibility pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// A worker group needs at least one worker
    #[error("Invalid group size: {0} (at least one worker is required)")]
    InvalidSize(usize),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Invalid tag specified (only `ANY_TAG` may be negative, and only on receive)
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Incoming message does not fit the receive buffer
    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    /// Incoming message carries a different element type than requested
    #[error("Datatype mismatch from rank {peer}: expected {expected:?}, found {found:?}")]
    DatatypeMismatch {
        /// Rank the message came from
        peer: i32,
        /// Type the receiver asked for
        expected: DatatypeTag,
        /// Type the sender used
        found: DatatypeTag,
    },

    /// Peers disagree about the message sequence (wrong round, role or payload)
    #[error("Protocol mismatch with rank {peer}: {detail}")]
    ProtocolMismatch {
        /// The rank on the other end of the failed exchange
        peer: i32,
        /// What went wrong
        detail: String,
    },

    /// The peer exited before the exchange completed
    #[error("Rank {0} disconnected")]
    PeerDisconnected(i32),

    /// A worker thread panicked
    #[error("Worker {0} panicked")]
    WorkerPanicked(i32),

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker {rank}: {source}")]
    Spawn {
        /// Rank of the worker that failed to start
        rank: i32,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Input parsing failed
    #[error(transparent)]
    Input(#[from] InputError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a [`Error::ProtocolMismatch`] for an exchange with `peer`.
    pub(crate) fn protocol(peer: i32, detail: impl Into<String>) -> Self {
        Error::ProtocolMismatch {
            peer,
            detail: detail.into(),
        }
    }
}

/// A single field of the altitude list that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    /// Zero-based position of the field in the list
    pub position: usize,
    /// The raw text of the field
    pub text: String,
    /// Why it was rejected
    pub reason: String,
}

impl std::fmt::Display for MalformedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {} ({:?}): {}", self.position, self.text, self.reason)
    }
}

/// Errors raised while parsing the altitude list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No altitude values at all
    #[error("no altitude values given")]
    Empty,

    /// One or more fields are not integers
    #[error("wrong input format: {} malformed field(s), first is {}", .0.len(), .0[0])]
    Malformed(Vec<MalformedField>),
}
