//! Narrative decoder.
//!
//! Each segment runs the Tier-2 lane check first. Lane fixes are kept only
//! when the patched word has clean Tier-1 syndromes; otherwise the received
//! codeword goes through the full Reed-Solomon locator. A segment whose
//! lanes need no fix costs one syndrome pass.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::canon::CanonRegistry;
use crate::config::FecConfig;
use crate::ecc::{
    BlockInterleaver, MiniSyndrome, ProtectedUnit, ReedSolomon, SegmentDecode, LANE_SYMBOLS,
    UNIT_LEN,
};
use crate::error::{Error, Result};
use crate::model::{DecodeStatistics, DecodedNarrative, ProtectedBlock, ProtectionLevel};
use crate::monitor::PerformanceMonitor;

/// Recovers narrative sequences from (possibly corrupted) protected payloads
pub struct Decoder {
    config: FecConfig,
    canon: Arc<CanonRegistry>,
    monitor: Arc<PerformanceMonitor>,
    tier1: ReedSolomon,
    tier2: MiniSyndrome,
}

impl Decoder {
    /// # Errors
    /// `Config` if the configuration does not validate
    pub fn new(
        config: FecConfig,
        canon: Arc<CanonRegistry>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Result<Self> {
        config.validate()?;
        let tier1 = ReedSolomon::from_config(&config)?;
        Ok(Self {
            config,
            canon,
            monitor,
            tier1,
            tier2: MiniSyndrome::new(),
        })
    }

    pub fn config(&self) -> &FecConfig {
        &self.config
    }

    /// Decode a stored block back to `expected` symbols
    pub fn decode_narrative(&self, block: &ProtectedBlock, expected: usize) -> DecodedNarrative {
        self.decode_payload(&block.payload, block.protection_level, expected)
    }

    /// Decode raw payload bytes.
    ///
    /// Never fails: malformed or unrecoverable input is reported through
    /// `recovery_successful` and `uncorrectable_bytes`.
    pub fn decode_payload(
        &self,
        payload: &[u8],
        level: ProtectionLevel,
        expected: usize,
    ) -> DecodedNarrative {
        let started = Instant::now();
        let mut stats = DecodeStatistics {
            recovery_successful: true,
            ..DecodeStatistics::default()
        };
        let codeword_len = self.tier1.codeword_len();
        let segments = payload.len() / codeword_len;

        let mut symbols = Vec::new();
        match self.layout(payload, level) {
            Ok(codewords) => {
                let codes = self.recover_codes(&codewords, expected, &mut stats);
                for code in codes {
                    match self.canon.decode_entry(code) {
                        Ok(entry) => symbols.push(entry),
                        Err(err) => {
                            trace!("dropping symbol: {}", err);
                            stats.uncorrectable_bytes += 1;
                            stats.recovery_successful = false;
                        }
                    }
                }
            }
            Err(err) => {
                warn!("payload of {} bytes rejected: {}", payload.len(), err);
                stats.uncorrectable_bytes = payload.len();
                stats.recovery_successful = false;
            }
        }

        stats.decode_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        stats.meets_performance_target =
            stats.decode_time_ms <= self.config.target_for_segments(segments);
        self.monitor.record_decode(&stats);

        debug!(
            "decoded {} symbols from {} segments in {:.3} ms: {:?} (tier-1 {}, tier-2 {})",
            symbols.len(),
            segments,
            stats.decode_time_ms,
            stats.outcome(),
            stats.tier1_corrections,
            stats.tier2_corrections
        );
        DecodedNarrative {
            symbols,
            statistics: stats,
        }
    }

    /// Validate the payload shape and undo interleaving
    fn layout(&self, payload: &[u8], level: ProtectionLevel) -> Result<Vec<u8>> {
        let codeword_len = self.tier1.codeword_len();
        if payload.is_empty() {
            return Err(Error::uncorrectable("payload is empty"));
        }
        let interleaver = BlockInterleaver::for_payload(payload.len(), codeword_len)?;
        let segments = payload.len() / codeword_len;
        if segments > self.config.max_segments {
            return Err(Error::uncorrectable(format!(
                "{} segments exceed the maximum of {}",
                segments, self.config.max_segments
            )));
        }

        if level.interleaved() {
            interleaver.deinterleave(payload)
        } else {
            Ok(payload.to_vec())
        }
    }

    /// Decode every segment and return the first `expected` symbol codes
    fn recover_codes(
        &self,
        codewords: &[u8],
        expected: usize,
        stats: &mut DecodeStatistics,
    ) -> Vec<u8> {
        let codeword_len = self.tier1.codeword_len();
        let segments = codewords.len() / codeword_len;
        let mut codes = Vec::with_capacity(
            expected.min(segments * self.config.symbols_per_segment()),
        );

        for (index, codeword) in codewords.chunks(codeword_len).enumerate() {
            let segment = self.decode_segment(codeword, stats);
            if !(segment.success && self.verify_lanes(&segment.data)) {
                debug!("segment {} is unrecoverable", index);
                stats.uncorrectable_bytes += codeword_len;
                stats.recovery_successful = false;
            }
            for unit in segment.data.chunks(UNIT_LEN) {
                codes.extend_from_slice(&unit[..unit.len().min(LANE_SYMBOLS)]);
            }
        }

        if expected > self.config.max_symbols() || codes.len() < expected {
            debug!(
                "recovered {} symbols, {} expected (block limit {})",
                codes.len(),
                expected,
                self.config.max_symbols()
            );
            stats.recovery_successful = false;
        }
        codes.truncate(expected);
        codes
    }

    fn decode_segment(&self, codeword: &[u8], stats: &mut DecodeStatistics) -> SegmentDecode {
        if let Some(segment) = self.fast_path(codeword, stats) {
            return segment;
        }

        let syndromes = self.tier1.syndromes(codeword);
        if syndromes.is_clean() {
            return self.tier1.finish_segment(codeword, 0, true);
        }

        stats.segments_full_decode += 1;
        let mut buffer = codeword.to_vec();
        match self.tier1.correct(&mut buffer, &syndromes) {
            Ok(corrected) => {
                stats.tier1_corrections += corrected;
                self.tier1.finish_segment(&buffer, corrected, true)
            }
            Err(err) => {
                debug!("tier-1 correction failed: {}", err);
                self.tier1.finish_segment(codeword, 0, false)
            }
        }
    }

    /// Run the Tier-2 lane check ahead of the locator.
    ///
    /// The lane fixes are accepted only when the patched word has clean
    /// syndromes. Returns `None` when no lane needed a fix, too many lanes
    /// were uncertain, or the fixes did not restore the codeword.
    fn fast_path(&self, codeword: &[u8], stats: &mut DecodeStatistics) -> Option<SegmentDecode> {
        let lanes = self.config.lanes_per_segment();
        let mut patched = codeword.to_vec();
        let mut fixed = 0;
        let mut uncertain = 0;

        for lane in patched[1..1 + lanes * UNIT_LEN].chunks_exact_mut(UNIT_LEN) {
            let unit = ProtectedUnit::from_bytes(lane).ok()?;
            let fix = self.tier2.try_fix(unit);
            if !fix.certain {
                uncertain += 1;
            } else if fix.fixed {
                fixed += 1;
                lane.copy_from_slice(&fix.unit.to_bytes());
            }
        }

        let uncertain_fraction = uncertain as f64 / lanes as f64;
        if uncertain_fraction > self.config.fast_path_uncertainty_limit || fixed == 0 {
            return None;
        }
        if !self.tier1.syndromes(&patched).is_clean() {
            trace!("{} lane fixes left the syndromes dirty", fixed);
            return None;
        }

        stats.tier2_corrections += fixed;
        stats.segments_fast_path += 1;
        Some(self.tier1.finish_segment(&patched, 0, true))
    }

    /// Every lane of a decoded segment must check clean
    fn verify_lanes(&self, data: &[u8]) -> bool {
        if data.len() % UNIT_LEN != 0 {
            return false;
        }
        match self.tier2.recover_stream(data) {
            Ok(recovery) => recovery.fixed_units == 0 && recovery.uncertain_units == 0,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::{Rotation, SymbolEntry};
    use crate::encoder::Encoder;
    use crate::model::RecoveryOutcome;
    use crate::store::MessageStore;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    struct Harness {
        encoder: Encoder,
        decoder: Decoder,
        monitor: Arc<PerformanceMonitor>,
    }

    fn harness() -> Harness {
        let config = FecConfig::default();
        let canon = Arc::new(CanonRegistry::standard());
        let monitor = Arc::new(PerformanceMonitor::new());
        let encoder = Encoder::new(
            config.clone(),
            Arc::clone(&canon),
            Arc::new(MessageStore::new()),
            Arc::clone(&monitor),
        )
        .unwrap();
        let decoder = Decoder::new(config, canon, Arc::clone(&monitor)).unwrap();
        Harness {
            encoder,
            decoder,
            monitor,
        }
    }

    fn sequence(len: usize) -> Vec<SymbolEntry> {
        CanonRegistry::standard().iter().cycle().skip(5).take(len).collect()
    }

    #[test]
    fn test_clean_round_trip() {
        let h = harness();
        for len in [1, 7, 8, 9, 191, 192, 193, 1000] {
            let seq = sequence(len);
            let message = h
                .encoder
                .encode_narrative("clean", &seq, ProtectionLevel::Standard)
                .unwrap();
            let decoded = h.decoder.decode_narrative(&message.protected_block, len);
            assert_eq!(decoded.symbols, seq, "length {}", len);
            assert_eq!(decoded.statistics.outcome(), RecoveryOutcome::Clean);
            assert_eq!(decoded.statistics.uncorrectable_bytes, 0);
        }
    }

    #[test]
    fn test_single_bit_uses_fast_path() {
        let h = harness();
        let seq = sequence(100);
        let message = h
            .encoder
            .encode_narrative("bit", &seq, ProtectionLevel::Standard)
            .unwrap();

        let mut payload = message.protected_block.payload.clone();
        // Inside the second lane's symbol bytes
        payload[1 + UNIT_LEN + 3] ^= 0x10;

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 100);
        assert_eq!(decoded.symbols, seq);
        let stats = decoded.statistics;
        assert!(stats.recovery_successful);
        assert_eq!(stats.tier2_corrections, 1);
        assert_eq!(stats.tier1_corrections, 0);
        assert_eq!(stats.segments_fast_path, 1);
        assert_eq!(stats.segments_full_decode, 0);
    }

    #[test]
    fn test_two_flips_in_one_lane_fall_back_to_tier1() {
        let h = harness();
        let seq = sequence(64);
        let message = h
            .encoder
            .encode_narrative("lane", &seq, ProtectionLevel::Standard)
            .unwrap();

        // Two different symbols of the first lane, one bit each
        let mut payload = message.protected_block.payload.clone();
        payload[2] ^= 0x01;
        payload[5] ^= 0x40;

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 64);
        assert_eq!(decoded.symbols, seq);
        let stats = decoded.statistics;
        assert!(stats.recovery_successful);
        assert_eq!(stats.tier2_corrections, 0);
        assert_eq!(stats.tier1_corrections, 2);
        assert_eq!(stats.segments_fast_path, 0);
        assert_eq!(stats.segments_full_decode, 1);
    }

    #[test]
    fn test_parity_error_needs_full_decode() {
        let h = harness();
        let seq = sequence(50);
        let message = h
            .encoder
            .encode_narrative("parity", &seq, ProtectionLevel::Standard)
            .unwrap();

        let mut payload = message.protected_block.payload.clone();
        payload[250] ^= 0xff;
        payload[251] ^= 0x01;

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 50);
        assert_eq!(decoded.symbols, seq);
        assert_eq!(decoded.statistics.tier1_corrections, 2);
        assert_eq!(decoded.statistics.segments_full_decode, 1);
        assert_eq!(decoded.statistics.outcome(), RecoveryOutcome::Corrected);
    }

    #[test]
    fn test_corrects_up_to_capacity_per_segment() {
        let h = harness();
        let seq = sequence(600);
        let message = h
            .encoder
            .encode_narrative("t", &seq, ProtectionLevel::Standard)
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let mut payload = message.protected_block.payload.clone();
        for segment in payload.chunks_mut(255) {
            let mut positions: Vec<usize> = (0..255).collect();
            for i in 0..16 {
                let j = rng.gen_range(i..255);
                positions.swap(i, j);
            }
            for &pos in &positions[..16] {
                segment[pos] ^= rng.gen_range(1..=255u8);
            }
        }

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 600);
        assert_eq!(decoded.symbols, seq);
        assert!(decoded.statistics.recovery_successful);
        assert_eq!(decoded.statistics.tier1_corrections, 16 * 4);
    }

    #[test]
    fn test_too_many_errors_reported() {
        let h = harness();
        let seq = sequence(300);
        let message = h
            .encoder
            .encode_narrative("overflow", &seq, ProtectionLevel::Standard)
            .unwrap();

        let mut payload = message.protected_block.payload.clone();
        for pos in (0..255).step_by(7).take(20) {
            payload[pos] ^= 0x5a;
        }

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 300);
        let stats = decoded.statistics;
        assert!(!stats.recovery_successful);
        assert!(stats.uncorrectable_bytes >= 255);
        assert_eq!(stats.outcome(), RecoveryOutcome::Unrecoverable);
    }

    #[test]
    fn test_enhanced_level_spreads_burst() {
        let h = harness();
        let seq = sequence(1500);
        let message = h
            .encoder
            .encode_narrative("burst", &seq, ProtectionLevel::Enhanced)
            .unwrap();
        let segments = message.protected_block.tier1_segment_count;
        assert_eq!(segments, 8);

        // 16 * 8 contiguous bytes land as 16 errors in each codeword
        let mut payload = message.protected_block.payload.clone();
        for byte in payload.iter_mut().skip(300).take(16 * segments) {
            *byte ^= 0xa5;
        }

        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Enhanced, 1500);
        assert_eq!(decoded.symbols, seq);
        assert!(decoded.statistics.recovery_successful);

        let standard = h
            .encoder
            .encode_narrative("burst", &seq, ProtectionLevel::Standard)
            .unwrap();
        let mut payload = standard.protected_block.payload.clone();
        for byte in payload.iter_mut().skip(300).take(16 * segments) {
            *byte ^= 0xa5;
        }
        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 1500);
        assert!(!decoded.statistics.recovery_successful);
    }

    #[test]
    fn test_malformed_payloads_do_not_panic() {
        let h = harness();
        for payload in [Vec::new(), vec![0u8; 100], vec![0u8; 255 * 17]] {
            let decoded = h
                .decoder
                .decode_payload(&payload, ProtectionLevel::Standard, 4);
            assert!(!decoded.statistics.recovery_successful);
            assert_eq!(decoded.statistics.uncorrectable_bytes, payload.len());
            assert!(decoded.symbols.is_empty());
        }
    }

    #[test]
    fn test_short_stream_and_unmapped_codes() {
        let h = harness();

        let message = h
            .encoder
            .encode_narrative("short", &sequence(10), ProtectionLevel::Standard)
            .unwrap();
        let decoded = h.decoder.decode_narrative(&message.protected_block, 40);
        assert!(!decoded.statistics.recovery_successful);

        // A valid codeword whose lanes carry codes outside the canon
        let rs = ReedSolomon::new(255, 16).unwrap();
        let stream = MiniSyndrome::new().protect_stream(&[0, 200, 4, 255]);
        let payload = rs.encode(&stream).unwrap();
        let decoded = h
            .decoder
            .decode_payload(&payload, ProtectionLevel::Standard, 4);
        let stats = decoded.statistics;
        assert!(!stats.recovery_successful);
        assert_eq!(stats.uncorrectable_bytes, 2);
        assert_eq!(
            decoded.symbols,
            vec![
                SymbolEntry::new("glyph_marrow", Rotation::Deg0),
                SymbolEntry::new("glyph_ember", Rotation::Deg0),
            ]
        );
    }

    #[test]
    fn test_oversized_expected_count_is_reported() {
        let h = harness();
        let seq = sequence(12);
        let message = h
            .encoder
            .encode_narrative("count", &seq, ProtectionLevel::Standard)
            .unwrap();

        for expected in [usize::MAX, 1 << 62, 3073] {
            let decoded = h.decoder.decode_narrative(&message.protected_block, expected);
            assert!(!decoded.statistics.recovery_successful, "expected {}", expected);
            assert_eq!(decoded.statistics.uncorrectable_bytes, 0);
            assert_eq!(&decoded.symbols[..12], &seq[..]);
        }

        let decoded = h
            .decoder
            .decode_payload(&[0u8; 255], ProtectionLevel::Standard, usize::MAX);
        assert!(!decoded.statistics.recovery_successful);
    }

    #[test]
    fn test_clean_segment_skips_locator() {
        let h = harness();
        let message = h
            .encoder
            .encode_narrative("clean", &sequence(400), ProtectionLevel::Standard)
            .unwrap();
        let decoded = h.decoder.decode_narrative(&message.protected_block, 400);
        let stats = decoded.statistics;
        assert!(stats.recovery_successful);
        assert_eq!(stats.segments_fast_path, 0);
        assert_eq!(stats.segments_full_decode, 0);
    }

    #[test]
    fn test_decodes_are_recorded() {
        let h = harness();
        let message = h
            .encoder
            .encode_narrative("monitor", &sequence(20), ProtectionLevel::Standard)
            .unwrap();
        h.decoder.decode_narrative(&message.protected_block, 20);
        h.decoder.decode_narrative(&message.protected_block, 20);

        let summary = h.monitor.summary();
        assert_eq!(summary.encodes, 1);
        assert_eq!(summary.decodes, 2);
        assert_eq!(summary.failed_decodes, 0);
    }
}
