//! Error types for ferropi

use crate::datatype::DatatypeTag;
use thiserror::Error;

/// Result type for runtime and estimator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime and estimator operations
#[derive(Error, Debug)]
pub enum Error {
    /// A world must contain at least one rank
    #[error("Invalid world size: {0} (at least one worker is required)")]
    InvalidWorldSize(i32),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Tag outside the range open to point-to-point messages
    #[error("Invalid tag: {0} (user tags must be non-negative)")]
    InvalidTag(i32),

    /// Send and receive buffers disagree in length
    #[error("Invalid buffer")]
    InvalidBuffer,

    /// Received element count does not fit the receive buffer
    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    /// Sender and receiver used different element types
    #[error("Datatype mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Type the receiver asked for
        expected: DatatypeTag,
        /// Type the sender put on the wire
        found: DatatypeTag,
    },

    /// Partition count must be a positive integer
    #[error("Invalid partition count: {0} (must be a positive integer)")]
    InvalidPartitionCount(i64),

    /// Input could not be parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O failure while prompting or reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another rank failed and the run was torn down
    #[error("Run aborted by another rank")]
    Aborted,

    /// A peer's channel closed while a message was expected
    #[error("Peer disconnected")]
    Disconnected,

    /// A rank panicked
    #[error("Rank {0} panicked")]
    RankPanicked(i32),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is only the echo of a failure on another rank.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted | Error::Disconnected)
    }
}
