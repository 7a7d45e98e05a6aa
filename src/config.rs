//! Codec configuration.
//!
//! The defaults describe a (255, 223) Reed-Solomon code correcting 16 byte
//! errors per codeword, with Tier-2 SECDED lanes packed into each codeword's
//! data region.

use crate::ecc::mini_syndrome::{LANE_SYMBOLS, UNIT_LEN};
use crate::error::{Error, Result};

/// Maximum codeword length over GF(256)
pub const MAX_CODEWORD_LEN: usize = 255;

/// Parameters for the two-tier codec and its harness
#[derive(Debug, Clone, PartialEq)]
pub struct FecConfig {
    /// Tier-1 codeword length `n` in bytes
    pub codeword_len: usize,
    /// Tier-1 correction capacity `t` in bytes per codeword
    pub correction_capacity: usize,
    /// Maximum Tier-1 segments per protected block
    pub max_segments: usize,
    /// Decode latency target for one codeword's worth of data
    pub performance_target_ms: f64,
    /// Acceptable overhead ratio band (low, high)
    pub overhead_band: (f64, f64),
    /// Fraction of uncertain Tier-2 lanes above which a segment skips the fast path
    pub fast_path_uncertainty_limit: f64,
    /// Bound on resident messages; oldest are evicted first
    pub store_capacity: Option<usize>,
    /// Seed used by the simulator when the caller does not supply one
    pub default_seed: u64,
}

impl Default for FecConfig {
    fn default() -> Self {
        Self {
            codeword_len: 255,
            correction_capacity: 16,
            max_segments: 16,
            performance_target_ms: 4.0,
            overhead_band: (1.30, 1.40),
            fast_path_uncertainty_limit: 0.0,
            store_capacity: None,
            default_seed: 0x5eed,
        }
    }
}

impl FecConfig {
    /// Checks every parameter, returning `Error::Config` on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.correction_capacity == 0 {
            return Err(Error::Config(
                "correction capacity must be positive".to_string(),
            ));
        }
        if self.codeword_len > MAX_CODEWORD_LEN {
            return Err(Error::Config(format!(
                "codeword length {} exceeds {}",
                self.codeword_len, MAX_CODEWORD_LEN
            )));
        }
        let parity = self.correction_capacity.checked_mul(2).ok_or_else(|| {
            Error::Config(format!(
                "correction capacity {} is out of range",
                self.correction_capacity
            ))
        })?;
        if self.codeword_len.saturating_sub(parity) < 1 + UNIT_LEN {
            return Err(Error::Config(format!(
                "codeword length {} leaves no room for one lane after {} parity bytes",
                self.codeword_len, parity
            )));
        }
        if self.max_segments == 0 {
            return Err(Error::Config("max segments must be positive".to_string()));
        }
        if !(self.performance_target_ms.is_finite() && self.performance_target_ms > 0.0) {
            return Err(Error::Config(
                "performance target must be a positive number of milliseconds".to_string(),
            ));
        }
        let (low, high) = self.overhead_band;
        if !(low >= 1.0 && low <= high) {
            return Err(Error::Config(format!(
                "overhead band ({low}, {high}) is not a valid range"
            )));
        }
        if !(0.0..=1.0).contains(&self.fast_path_uncertainty_limit) {
            return Err(Error::Config(
                "fast path uncertainty limit must lie in [0, 1]".to_string(),
            ));
        }
        if self.store_capacity == Some(0) {
            return Err(Error::Config("store capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Data bytes per codeword (`k = n - 2t`)
    pub fn data_len(&self) -> usize {
        self.codeword_len - 2 * self.correction_capacity
    }

    /// Tier-2 lanes that fit in one codeword after the length prefix
    pub fn lanes_per_segment(&self) -> usize {
        (self.data_len() - 1) / UNIT_LEN
    }

    pub fn symbols_per_segment(&self) -> usize {
        self.lanes_per_segment() * LANE_SYMBOLS
    }

    /// Longest narrative sequence a single block can carry
    pub fn max_symbols(&self) -> usize {
        self.max_segments * self.symbols_per_segment()
    }

    /// Latency budget for a block of `segments` codewords
    pub fn target_for_segments(&self, segments: usize) -> f64 {
        self.performance_target_ms * segments.max(1) as f64
    }

    /// Whether `ratio` sits inside the configured overhead band
    pub fn overhead_in_band(&self, ratio: f64) -> bool {
        let (low, high) = self.overhead_band;
        ratio >= low && ratio <= high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let config = FecConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_len(), 223);
        assert_eq!(config.lanes_per_segment(), 24);
        assert_eq!(config.symbols_per_segment(), 192);
        assert_eq!(config.max_symbols(), 3072);
        assert_eq!(config.target_for_segments(3), 12.0);
    }

    #[test]
    fn test_invalid_configs() {
        let config = FecConfig {
            correction_capacity: 0,
            ..FecConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = FecConfig {
            codeword_len: 300,
            ..FecConfig::default()
        };
        assert!(config.validate().is_err());

        // 2t = 120 leaves 8 data bytes, not enough for prefix + lane
        let config = FecConfig {
            codeword_len: 128,
            correction_capacity: 60,
            ..FecConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FecConfig {
            correction_capacity: usize::MAX / 2 + 1,
            ..FecConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = FecConfig {
            correction_capacity: usize::MAX / 4,
            ..FecConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = FecConfig {
            overhead_band: (1.4, 1.3),
            ..FecConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FecConfig {
            performance_target_ms: f64::NAN,
            ..FecConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FecConfig {
            store_capacity: Some(0),
            ..FecConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shortened_code_geometry() {
        let config = FecConfig {
            codeword_len: 64,
            correction_capacity: 4,
            ..FecConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.data_len(), 56);
        assert_eq!(config.lanes_per_segment(), 6);
        assert_eq!(config.symbols_per_segment(), 48);
    }

    #[test]
    fn test_overhead_band() {
        let config = FecConfig::default();
        assert!(config.overhead_in_band(1.328));
        assert!(!config.overhead_in_band(1.5));
        assert!(!config.overhead_in_band(1.2));
    }
}
