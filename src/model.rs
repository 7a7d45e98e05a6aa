//! Protected message data model.

use crate::canon::{ResolvedSymbol, SymbolEntry};
use std::fmt;

/// An ordered narrative; insertion order is the message
pub type NarrativeSequence = Vec<SymbolEntry>;

/// How codewords are laid out in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtectionLevel {
    /// Codewords back to back
    #[default]
    Standard,
    /// Codewords byte-interleaved so a contiguous burst is spread over every segment
    Enhanced,
}

impl ProtectionLevel {
    pub fn interleaved(self) -> bool {
        matches!(self, ProtectionLevel::Enhanced)
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionLevel::Standard => write!(f, "standard"),
            ProtectionLevel::Enhanced => write!(f, "enhanced"),
        }
    }
}

/// The protected bytes of one encode call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedBlock {
    pub block_id: u64,
    pub payload: Vec<u8>,
    pub tier1_segment_count: usize,
    pub tier2_redundancy_bits_per_symbol: u32,
    pub protection_level: ProtectionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectionMetadata {
    pub encoding_time_ms: f64,
    /// Payload bytes per original symbol byte
    pub overhead_ratio: f64,
    pub protection_level: ProtectionLevel,
}

/// An encoded narrative as held by the store; never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedMessage {
    pub block_id: u64,
    pub description: String,
    pub original_symbols: Vec<ResolvedSymbol>,
    pub protected_block: ProtectedBlock,
    pub metadata: ProtectionMetadata,
}

impl ProtectedMessage {
    pub fn symbol_count(&self) -> usize {
        self.original_symbols.len()
    }

    /// The original sequence without canon glosses
    pub fn entries(&self) -> NarrativeSequence {
        self.original_symbols
            .iter()
            .map(|symbol| symbol.entry.clone())
            .collect()
    }
}

/// Coarse classification of a decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No corruption was found
    Clean,
    /// Corruption was found and corrected
    Corrected,
    /// Best effort only; the recovered symbols must not be trusted
    Unrecoverable,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodeStatistics {
    pub decode_time_ms: f64,
    /// Tier-2 units repaired by the fast path
    pub tier2_corrections: usize,
    /// Bytes repaired by the Tier-1 locator
    pub tier1_corrections: usize,
    /// Bytes in failed segments plus symbol bytes the canon rejected
    pub uncorrectable_bytes: usize,
    pub recovery_successful: bool,
    pub meets_performance_target: bool,
    /// Segments completed by the Tier-2 fast path
    pub segments_fast_path: usize,
    /// Segments that needed the full Tier-1 locator
    pub segments_full_decode: usize,
}

impl DecodeStatistics {
    pub fn outcome(&self) -> RecoveryOutcome {
        if !self.recovery_successful {
            RecoveryOutcome::Unrecoverable
        } else if self.tier1_corrections + self.tier2_corrections == 0 {
            RecoveryOutcome::Clean
        } else {
            RecoveryOutcome::Corrected
        }
    }
}

/// Symbols recovered by the decoder together with how they were recovered
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNarrative {
    /// Recovered symbols; codes the canon rejects are left out, so only
    /// trust this when `statistics.recovery_successful` is set
    pub symbols: NarrativeSequence,
    pub statistics: DecodeStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        let mut stats = DecodeStatistics {
            recovery_successful: true,
            ..DecodeStatistics::default()
        };
        assert_eq!(stats.outcome(), RecoveryOutcome::Clean);

        stats.tier2_corrections = 1;
        assert_eq!(stats.outcome(), RecoveryOutcome::Corrected);

        stats.recovery_successful = false;
        assert_eq!(stats.outcome(), RecoveryOutcome::Unrecoverable);
    }

    #[test]
    fn test_protection_level() {
        assert_eq!(ProtectionLevel::default(), ProtectionLevel::Standard);
        assert!(ProtectionLevel::Enhanced.interleaved());
        assert!(!ProtectionLevel::Standard.interleaved());
        assert_eq!(ProtectionLevel::Enhanced.to_string(), "enhanced");
    }
}
