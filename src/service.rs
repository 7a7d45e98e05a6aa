//! Service facade wiring the codec components together.

use std::sync::Arc;

use log::debug;

use crate::canon::{CanonRegistry, SymbolEntry};
use crate::config::FecConfig;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::model::{DecodedNarrative, ProtectedMessage, ProtectionLevel};
use crate::monitor::{PerformanceMonitor, PerformanceSummary};
use crate::simulator::{TransmissionSimulator, TrialResult, TrialSummary};
use crate::store::MessageStore;

/// One codec instance: canon, store and monitor shared by the encoder,
/// decoder and simulator
pub struct FecService {
    config: FecConfig,
    canon: Arc<CanonRegistry>,
    store: Arc<MessageStore>,
    monitor: Arc<PerformanceMonitor>,
    encoder: Encoder,
    decoder: Arc<Decoder>,
    simulator: TransmissionSimulator,
}

impl FecService {
    /// # Errors
    /// `Config` if the configuration does not validate
    pub fn new(config: FecConfig) -> Result<Self> {
        config.validate()?;
        let canon = Arc::new(CanonRegistry::standard());
        let store = Arc::new(MessageStore::from_config(&config));
        let monitor = Arc::new(PerformanceMonitor::new());

        let encoder = Encoder::new(
            config.clone(),
            Arc::clone(&canon),
            Arc::clone(&store),
            Arc::clone(&monitor),
        )?;
        let decoder = Arc::new(Decoder::new(
            config.clone(),
            Arc::clone(&canon),
            Arc::clone(&monitor),
        )?);
        let simulator = TransmissionSimulator::new(
            Arc::clone(&decoder),
            Arc::clone(&store),
            Arc::clone(&monitor),
        );

        debug!(
            "service ready: n={} t={} max {} symbols per block",
            config.codeword_len,
            config.correction_capacity,
            config.max_symbols()
        );
        Ok(Self {
            config,
            canon,
            store,
            monitor,
            encoder,
            decoder,
            simulator,
        })
    }

    /// Encode and store a narrative, returning the stored message
    pub fn encode(
        &self,
        description: &str,
        sequence: &[SymbolEntry],
        level: ProtectionLevel,
    ) -> Result<Arc<ProtectedMessage>> {
        self.encoder.encode_narrative(description, sequence, level)
    }

    /// Encode `(name, degrees)` pairs at the standard level
    ///
    /// # Errors
    /// `UnknownSymbol` for a rotation that is not a quarter turn, plus
    /// everything [`encode`](Self::encode) returns
    pub fn encode_pairs(
        &self,
        description: &str,
        pairs: &[(&str, u16)],
    ) -> Result<Arc<ProtectedMessage>> {
        let sequence = pairs
            .iter()
            .map(|&(name, degrees)| SymbolEntry::from_degrees(name, degrees))
            .collect::<Result<Vec<_>>>()?;
        self.encode(description, &sequence, ProtectionLevel::Standard)
    }

    /// Decode a stored block back to `expected` symbols
    ///
    /// # Errors
    /// `BlockNotFound` for an unknown id; corruption is reported in the
    /// returned statistics
    pub fn decode(&self, block_id: u64, expected: usize) -> Result<DecodedNarrative> {
        let message = self.store.get(block_id)?;
        Ok(self
            .decoder
            .decode_narrative(&message.protected_block, expected))
    }

    /// Decode a payload that did not come from the store
    pub fn decode_bytes(
        &self,
        payload: &[u8],
        level: ProtectionLevel,
        expected: usize,
    ) -> DecodedNarrative {
        self.decoder.decode_payload(payload, level, expected)
    }

    /// Simulate one transmission of a stored block; `None` uses the
    /// configured default seed
    pub fn simulate_transmission(
        &self,
        block_id: u64,
        error_rate: f64,
        seed: Option<u64>,
    ) -> Result<TrialResult> {
        self.simulator
            .simulate_block(block_id, error_rate, seed.unwrap_or(self.config.default_seed))
    }

    pub fn run_trials(
        &self,
        block_id: u64,
        error_rate: f64,
        trials: usize,
        base_seed: u64,
    ) -> Result<TrialSummary> {
        let message = self.store.get(block_id)?;
        self.simulator
            .run_trials(&message, error_rate, trials, base_seed)
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        self.monitor.summary()
    }

    pub fn canon(&self) -> &CanonRegistry {
        &self.canon
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn config(&self) -> &FecConfig {
        &self.config
    }

    /// Stored message for `block_id`
    pub fn message(&self, block_id: u64) -> Result<Arc<ProtectedMessage>> {
        self.store.get(block_id)
    }

    /// Gloss for a `(name, degrees)` pair
    pub fn meaning(&self, name: &str, degrees: u16) -> Result<String> {
        self.canon.meaning(name, degrees)
    }
}
