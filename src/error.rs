//! Error types for the narrative FEC codec.
//!
//! Input validation failures (unknown symbols, stale block ids, bad
//! parameters) surface as [`Error`] values. Corruption that cannot be
//! corrected is normally reported through
//! [`DecodeStatistics`](crate::model::DecodeStatistics) instead, so callers can
//! tell "corrected" apart from "best-effort, do not trust".

use thiserror::Error;

/// Top-level error type for all codec operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The (name, rotation) pair is not part of the canon
    #[error("unknown symbol: {name} at rotation {rotation}")]
    UnknownSymbol { name: String, rotation: u16 },

    /// A byte outside the registered canon range
    #[error("unknown symbol code: {0:#04x}")]
    UnknownCode(u8),

    /// No protected message is stored under this id
    #[error("block {0} not found")]
    BlockNotFound(u64),

    /// Tier-1 could not restore a codeword (too many errors or malformed length)
    #[error("uncorrectable block: {reason}")]
    UncorrectableBlock { reason: String },

    /// Invalid argument supplied by the caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input exceeds what the configured code can carry
    #[error("input too large: {length} exceeds maximum {max_length}")]
    InputTooLarge { length: usize, max_length: usize },

    /// Configuration values are inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn uncorrectable(reason: impl Into<String>) -> Self {
        Error::UncorrectableBlock {
            reason: reason.into(),
        }
    }
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
