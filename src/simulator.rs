//! Noisy-channel simulation for protected messages.
//!
//! Every bit of a payload is flipped independently with probability
//! `error_rate`, drawn from a seeded ChaCha20 stream. The same payload, rate
//! and seed always produce the same corruption, so any trial can be replayed
//! from its seed.

use std::sync::Arc;

use bitvec::prelude::*;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Bernoulli, Distribution};
use rayon::prelude::*;

use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::model::{DecodeStatistics, ProtectedMessage};
use crate::monitor::PerformanceMonitor;
use crate::store::MessageStore;

/// Highest bit error rate the simulator accepts
pub const MAX_ERROR_RATE: f64 = 0.1;

/// A corrupted copy of a payload
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionTrial {
    pub error_rate: f64,
    pub seed: u64,
    pub corrupted_payload: Vec<u8>,
    pub bits_flipped: usize,
}

/// Outcome of pushing one message through the channel
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub trial: CorruptionTrial,
    /// Decode succeeded and every symbol matches the original, in order
    pub narrative_preserved: bool,
    pub statistics: DecodeStatistics,
}

/// Aggregate over a batch of trials
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub trials: usize,
    pub preserved: usize,
    pub preservation_rate: f64,
    pub average_decode_ms: f64,
    pub max_decode_ms: f64,
    pub average_bits_flipped: f64,
    /// Fraction of decodes that met their latency target
    pub within_target_rate: f64,
}

impl TrialSummary {
    fn from_results(results: &[TrialResult]) -> Self {
        let trials = results.len();
        let count = trials.max(1) as f64;
        let preserved = results.iter().filter(|r| r.narrative_preserved).count();
        let within_target = results
            .iter()
            .filter(|r| r.statistics.meets_performance_target)
            .count();

        Self {
            trials,
            preserved,
            preservation_rate: preserved as f64 / count,
            average_decode_ms: results
                .iter()
                .map(|r| r.statistics.decode_time_ms)
                .sum::<f64>()
                / count,
            max_decode_ms: results
                .iter()
                .map(|r| r.statistics.decode_time_ms)
                .fold(0.0, f64::max),
            average_bits_flipped: results
                .iter()
                .map(|r| r.trial.bits_flipped as f64)
                .sum::<f64>()
                / count,
            within_target_rate: within_target as f64 / count,
        }
    }
}

/// Corrupts stored payloads and checks whether the decoder recovers them
pub struct TransmissionSimulator {
    decoder: Arc<Decoder>,
    store: Arc<MessageStore>,
    monitor: Arc<PerformanceMonitor>,
}

impl TransmissionSimulator {
    pub fn new(
        decoder: Arc<Decoder>,
        store: Arc<MessageStore>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        Self {
            decoder,
            store,
            monitor,
        }
    }

    /// Flip each bit of `payload` with probability `error_rate`.
    ///
    /// # Errors
    /// `InvalidInput` if `error_rate` is not within `[0, MAX_ERROR_RATE]`
    pub fn corrupt(payload: &[u8], error_rate: f64, seed: u64) -> Result<CorruptionTrial> {
        check_rate(error_rate)?;
        let flip = Bernoulli::new(error_rate)
            .map_err(|err| Error::InvalidInput(format!("error rate {}: {}", error_rate, err)))?;
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let mut corrupted_payload = payload.to_vec();
        let mut bits_flipped = 0;
        for mut bit in corrupted_payload.view_bits_mut::<Msb0>().iter_mut() {
            if flip.sample(&mut rng) {
                *bit = !*bit;
                bits_flipped += 1;
            }
        }

        Ok(CorruptionTrial {
            error_rate,
            seed,
            corrupted_payload,
            bits_flipped,
        })
    }

    /// Corrupt a message's payload once and decode it
    ///
    /// # Errors
    /// `InvalidInput` for an error rate out of range
    pub fn simulate(
        &self,
        message: &ProtectedMessage,
        error_rate: f64,
        seed: u64,
    ) -> Result<TrialResult> {
        let result = self.run_one(message, error_rate, seed)?;
        debug!(
            "block {} at rate {} (seed {}): {} bits flipped, preserved: {}",
            message.block_id,
            error_rate,
            seed,
            result.trial.bits_flipped,
            result.narrative_preserved
        );
        Ok(result)
    }

    /// [`simulate`](Self::simulate) for a stored block
    ///
    /// # Errors
    /// `BlockNotFound` for an unknown id, `InvalidInput` for a bad rate
    pub fn simulate_block(&self, block_id: u64, error_rate: f64, seed: u64) -> Result<TrialResult> {
        let message = self.store.get(block_id)?;
        self.simulate(&message, error_rate, seed)
    }

    /// Run `trials` independent simulations in parallel.
    ///
    /// Trial `i` uses seed `base_seed + i`, so the summary does not depend
    /// on scheduling.
    ///
    /// # Errors
    /// `InvalidInput` for a bad rate or zero trials
    pub fn run_trials(
        &self,
        message: &ProtectedMessage,
        error_rate: f64,
        trials: usize,
        base_seed: u64,
    ) -> Result<TrialSummary> {
        check_rate(error_rate)?;
        if trials == 0 {
            return Err(Error::InvalidInput(
                "at least one trial is required".to_string(),
            ));
        }

        let results = (0..trials as u64)
            .into_par_iter()
            .map(|i| self.run_one(message, error_rate, base_seed.wrapping_add(i)))
            .collect::<Result<Vec<_>>>()?;

        let summary = TrialSummary::from_results(&results);
        debug!(
            "block {}: {}/{} trials preserved at rate {}",
            message.block_id, summary.preserved, summary.trials, error_rate
        );
        Ok(summary)
    }

    fn run_one(&self, message: &ProtectedMessage, error_rate: f64, seed: u64) -> Result<TrialResult> {
        let block = &message.protected_block;
        let trial = Self::corrupt(&block.payload, error_rate, seed)?;
        let decoded = self.decoder.decode_payload(
            &trial.corrupted_payload,
            block.protection_level,
            message.symbol_count(),
        );

        let narrative_preserved = decoded.statistics.recovery_successful
            && decoded.symbols.len() == message.symbol_count()
            && decoded
                .symbols
                .iter()
                .zip(&message.original_symbols)
                .all(|(got, want)| *got == want.entry);
        self.monitor.record_simulation(narrative_preserved);

        Ok(TrialResult {
            trial,
            narrative_preserved,
            statistics: decoded.statistics,
        })
    }
}

fn check_rate(error_rate: f64) -> Result<()> {
    if !(0.0..=MAX_ERROR_RATE).contains(&error_rate) {
        return Err(Error::InvalidInput(format!(
            "error rate {} outside [0, {}]",
            error_rate, MAX_ERROR_RATE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::CanonRegistry;
    use crate::config::FecConfig;
    use crate::encoder::Encoder;
    use crate::model::ProtectionLevel;

    struct Harness {
        encoder: Encoder,
        simulator: TransmissionSimulator,
        monitor: Arc<PerformanceMonitor>,
    }

    fn harness() -> Harness {
        let config = FecConfig::default();
        let canon = Arc::new(CanonRegistry::standard());
        let store = Arc::new(MessageStore::new());
        let monitor = Arc::new(PerformanceMonitor::new());
        let encoder = Encoder::new(
            config.clone(),
            Arc::clone(&canon),
            Arc::clone(&store),
            Arc::clone(&monitor),
        )
        .unwrap();
        let decoder = Arc::new(Decoder::new(config, canon, Arc::clone(&monitor)).unwrap());
        Harness {
            encoder,
            simulator: TransmissionSimulator::new(decoder, store, Arc::clone(&monitor)),
            monitor,
        }
    }

    fn message(h: &Harness, len: usize) -> Arc<ProtectedMessage> {
        let seq: Vec<_> = CanonRegistry::standard().iter().cycle().take(len).collect();
        h.encoder
            .encode_narrative("sim", &seq, ProtectionLevel::Standard)
            .unwrap()
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let payload: Vec<u8> = (0..=255).collect();
        let trial = TransmissionSimulator::corrupt(&payload, 0.0, 3).unwrap();
        assert_eq!(trial.corrupted_payload, payload);
        assert_eq!(trial.bits_flipped, 0);
    }

    #[test]
    fn test_corruption_is_deterministic() {
        let payload = vec![0u8; 2048];
        let a = TransmissionSimulator::corrupt(&payload, 0.05, 77).unwrap();
        let b = TransmissionSimulator::corrupt(&payload, 0.05, 77).unwrap();
        let c = TransmissionSimulator::corrupt(&payload, 0.05, 78).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.corrupted_payload, c.corrupted_payload);

        let ones: usize = a
            .corrupted_payload
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum();
        assert_eq!(ones, a.bits_flipped);
        // 16384 bits at 5%: expect ~819
        assert!((600..1050).contains(&a.bits_flipped));
    }

    #[test]
    fn test_rejects_bad_rates() {
        for rate in [-0.01, 0.1001, 1.0, f64::NAN] {
            assert!(matches!(
                TransmissionSimulator::corrupt(&[0u8; 4], rate, 0),
                Err(Error::InvalidInput(_))
            ));
        }
        assert!(TransmissionSimulator::corrupt(&[0u8; 4], MAX_ERROR_RATE, 0).is_ok());
    }

    #[test]
    fn test_simulate_clean_channel() {
        let h = harness();
        let message = message(&h, 64);
        let result = h.simulator.simulate(&message, 0.0, 1).unwrap();
        assert!(result.narrative_preserved);
        assert!(result.statistics.recovery_successful);

        let by_id = h
            .simulator
            .simulate_block(message.block_id, 0.0, 1)
            .unwrap();
        assert_eq!(by_id.trial, result.trial);
        assert!(matches!(
            h.simulator.simulate_block(9999, 0.0, 1),
            Err(Error::BlockNotFound(9999))
        ));
        assert_eq!(h.monitor.summary().simulations, 2);
    }

    #[test]
    fn test_trials_are_reproducible() {
        let h = harness();
        let message = message(&h, 192);
        let first = h.simulator.run_trials(&message, 0.002, 32, 500).unwrap();
        let second = h.simulator.run_trials(&message, 0.002, 32, 500).unwrap();

        assert_eq!(first.trials, 32);
        assert_eq!(first.preserved, second.preserved);
        assert_eq!(first.average_bits_flipped, second.average_bits_flipped);
        // ~4 bit errors per codeword is well inside capacity
        assert_eq!(first.preserved, 32);

        assert!(h.simulator.run_trials(&message, 0.002, 0, 500).is_err());
    }
}
