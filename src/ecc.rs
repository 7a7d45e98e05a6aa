//! Error correction code implementations.
//!
//! The narrative codec is built from:
//! - Reed-Solomon over GF(2^8) (Tier 1), correcting up to `t` corrupted
//!   bytes per codeword
//! - Extended Hamming SECDED lanes (Tier 2), correcting a single flipped bit
//!   per lane of 8 symbols without running the Tier-1 locator; two flipped
//!   bits in one lane fall back to Tier-1
//! - A block interleaver spreading bursts across codewords
//!
//! # Examples
//!
//! ```rust
//! use narrative_fec::ecc::{ErrorCorrection, ReedSolomon};
//!
//! let rs = ReedSolomon::new(255, 16).unwrap();
//! let mut encoded = rs.encode(b"glyph").unwrap();
//! encoded[3] ^= 0xff;
//! assert_eq!(ErrorCorrection::decode(&rs, &encoded).unwrap(), b"glyph");
//! ```

use crate::error::Result;

/// Trait for error correction code implementations
pub trait ErrorCorrection {
    /// Encode data with error correction symbols
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decode data and correct errors if possible
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Finite field arithmetic in GF(2^8)
pub mod galois;

/// Codeword interleaving for the enhanced protection level
pub mod interleave;

/// Tier-2 single-bit fast path
pub mod mini_syndrome;

/// Reed-Solomon error correction codes
pub mod reed_solomon;

pub use interleave::BlockInterleaver;
pub use mini_syndrome::{MiniSyndrome, ProtectedUnit, Tier2Fix, LANE_SYMBOLS, UNIT_LEN};
pub use reed_solomon::{ReedSolomon, SegmentDecode, Syndromes, Tier1Decode};
