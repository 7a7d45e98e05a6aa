//! Two-tier forward error correction for symbolic narrative sequences.
//!
//! A narrative is an ordered list of canon symbols (a named glyph at one of
//! four rotations). Encoding maps each symbol to a byte, packs the bytes into
//! SECDED-protected lanes and frames the lanes into Reed-Solomon codewords.
//! Decoding tries the cheap lane fixes first and falls back to the full
//! Reed-Solomon locator only when they do not restore the codeword.
//!
//! ```rust
//! use narrative_fec::{FecConfig, FecService};
//!
//! let service = FecService::new(FecConfig::default()).unwrap();
//! let message = service
//!     .encode_pairs("opening", &[("glyph_marrow", 0), ("VALIDATE", 270)])
//!     .unwrap();
//!
//! let decoded = service.decode(message.block_id, 2).unwrap();
//! assert!(decoded.statistics.recovery_successful);
//! assert_eq!(decoded.symbols, message.entries());
//! ```

pub mod canon;
pub mod config;
pub mod decoder;
pub mod ecc;
pub mod encoder;
pub mod error;
pub mod model;
pub mod monitor;
pub mod service;
pub mod simulator;
pub mod store;

pub use canon::{CanonRegistry, ResolvedSymbol, Rotation, SymbolEntry};
pub use config::FecConfig;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use model::{
    DecodeStatistics, DecodedNarrative, NarrativeSequence, ProtectedBlock, ProtectedMessage,
    ProtectionLevel, ProtectionMetadata, RecoveryOutcome,
};
pub use monitor::{PerformanceMonitor, PerformanceSummary};
pub use service::FecService;
pub use simulator::{CorruptionTrial, TransmissionSimulator, TrialResult, TrialSummary};
pub use store::MessageStore;
