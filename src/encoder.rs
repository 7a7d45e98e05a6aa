//! Narrative encoder: canon lookup, Tier-2 lanes, Tier-1 framing, storage.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::canon::{CanonRegistry, SymbolEntry};
use crate::config::FecConfig;
use crate::ecc::mini_syndrome::REDUNDANCY_BITS_PER_SYMBOL;
use crate::ecc::{BlockInterleaver, MiniSyndrome, ReedSolomon, UNIT_LEN};
use crate::error::{Error, Result};
use crate::model::{ProtectedBlock, ProtectedMessage, ProtectionLevel, ProtectionMetadata};
use crate::monitor::PerformanceMonitor;
use crate::store::MessageStore;

/// Turns narrative sequences into stored [`ProtectedMessage`]s
pub struct Encoder {
    config: FecConfig,
    canon: Arc<CanonRegistry>,
    store: Arc<MessageStore>,
    monitor: Arc<PerformanceMonitor>,
    tier1: ReedSolomon,
    tier2: MiniSyndrome,
}

impl Encoder {
    /// # Errors
    /// `Config` if the configuration does not validate
    pub fn new(
        config: FecConfig,
        canon: Arc<CanonRegistry>,
        store: Arc<MessageStore>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Result<Self> {
        config.validate()?;
        let tier1 = ReedSolomon::from_config(&config)?;
        Ok(Self {
            config,
            canon,
            store,
            monitor,
            tier1,
            tier2: MiniSyndrome::new(),
        })
    }

    /// Encode, protect and store a narrative sequence.
    ///
    /// Resolution is all-or-nothing: the first unknown entry aborts the call
    /// before anything is stored.
    ///
    /// # Errors
    /// `UnknownSymbol` for an entry outside the canon, `InvalidInput` for an
    /// empty sequence, `InputTooLarge` past the configured maximum length.
    pub fn encode_narrative(
        &self,
        description: &str,
        sequence: &[SymbolEntry],
        level: ProtectionLevel,
    ) -> Result<Arc<ProtectedMessage>> {
        if sequence.is_empty() {
            return Err(Error::InvalidInput(
                "narrative sequence is empty".to_string(),
            ));
        }
        let max_symbols = self.config.max_symbols();
        if sequence.len() > max_symbols {
            return Err(Error::InputTooLarge {
                length: sequence.len(),
                max_length: max_symbols,
            });
        }

        let original_symbols = sequence
            .iter()
            .map(|entry| self.canon.resolve(entry))
            .collect::<Result<Vec<_>>>()?;
        let codes: Vec<u8> = original_symbols.iter().map(|symbol| symbol.code).collect();

        let started = Instant::now();
        let payload = self.protect(&codes, level)?;
        let encoding_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let overhead_ratio = payload.len() as f64 / codes.len() as f64;
        if !self.config.overhead_in_band(overhead_ratio) {
            debug!(
                "overhead {:.3} outside band {:?} for {} symbols",
                overhead_ratio,
                self.config.overhead_band,
                codes.len()
            );
        }

        let block_id = self.store.reserve_id();
        let metadata = ProtectionMetadata {
            encoding_time_ms,
            overhead_ratio,
            protection_level: level,
        };
        let message = Arc::new(ProtectedMessage {
            block_id,
            description: description.to_string(),
            original_symbols,
            protected_block: ProtectedBlock {
                block_id,
                tier1_segment_count: payload.len() / self.tier1.codeword_len(),
                tier2_redundancy_bits_per_symbol: REDUNDANCY_BITS_PER_SYMBOL,
                protection_level: level,
                payload,
            },
            metadata,
        });

        if let Err(err) = self.store.put(Arc::clone(&message)) {
            warn!("block {} could not be stored: {}", block_id, err);
            return Err(err);
        }
        self.monitor.record_encode(&metadata);

        debug!(
            "encoded block {} ({} symbols, {} segments, {} level) in {:.3} ms, payload {}..",
            block_id,
            codes.len(),
            message.protected_block.tier1_segment_count,
            level,
            encoding_time_ms,
            hex::encode(&message.protected_block.payload[..8])
        );
        Ok(message)
    }

    /// Protect raw symbol codes: Tier-2 lanes framed into Tier-1 codewords,
    /// interleaved for the enhanced level.
    pub fn protect(&self, codes: &[u8], level: ProtectionLevel) -> Result<Vec<u8>> {
        let stream = self.tier2.protect_stream(codes);
        let per_segment = self.config.lanes_per_segment() * UNIT_LEN;
        let codewords = if stream.is_empty() {
            self.tier1.encode(&stream)?
        } else {
            self.tier1.encode_segments(stream.chunks(per_segment))?
        };

        if level.interleaved() {
            BlockInterleaver::for_payload(codewords.len(), self.tier1.codeword_len())?
                .interleave(&codewords)
        } else {
            Ok(codewords)
        }
    }
}
