//! Tier-2 "mini-syndrome": extended Hamming SECDED over lanes of symbol bytes.
//!
//! Each lane of 8 symbol bytes (64 bits) carries one check byte: seven
//! Hamming parity bits plus an overall parity bit, the (72,64) code used in
//! ECC memory. A single flipped bit anywhere in the 9-byte unit is located
//! and corrected; two flipped bits are detected and reported as uncertain so
//! the caller can fall back to the Tier-1 block decoder.
//!
//! Correction is per lane, not per symbol byte: two symbols of the same lane
//! with one flipped bit each make the lane uncertain, and the segment is then
//! repaired by Tier-1 instead.
//!
//! The Hamming bits are kept in a separate check byte rather than
//! interleaved with the data, so a protected unit reads as the plain symbols
//! followed by one extra byte. Data bit `i` (MSB first) sits at Hamming
//! position `DATA_POSITIONS[i]`, the i-th position that is not a power of two.

use crate::ecc::ErrorCorrection;
use crate::error::{Error, Result};
use bitvec::prelude::*;

/// Symbol bytes guarded by one check byte
pub const LANE_SYMBOLS: usize = 8;

/// Bytes in a protected unit (lane plus check byte)
pub const UNIT_LEN: usize = LANE_SYMBOLS + 1;

/// Redundancy carried per symbol, in bits
pub const REDUNDANCY_BITS_PER_SYMBOL: u32 = 8 / LANE_SYMBOLS as u32;

const HAMMING_MASK: u8 = 0x7f;
const OVERALL_PARITY: u8 = 0x80;
const LANE_BITS: usize = LANE_SYMBOLS * 8;
const NOT_DATA: u8 = u8::MAX;

static DATA_POSITIONS: [u8; LANE_BITS] = data_positions();
static POSITION_TO_BIT: [u8; 128] = position_to_bit();

const fn data_positions() -> [u8; LANE_BITS] {
    let mut positions = [0u8; LANE_BITS];
    let mut pos: u8 = 1;
    let mut i = 0;
    while i < LANE_BITS {
        if pos & (pos - 1) != 0 {
            positions[i] = pos;
            i += 1;
        }
        pos += 1;
    }
    positions
}

const fn position_to_bit() -> [u8; 128] {
    let positions = data_positions();
    let mut table = [NOT_DATA; 128];
    let mut i = 0;
    while i < LANE_BITS {
        table[positions[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// A lane of symbols with its SECDED check byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedUnit {
    pub symbols: [u8; LANE_SYMBOLS],
    pub check: u8,
}

impl ProtectedUnit {
    pub fn to_bytes(&self) -> [u8; UNIT_LEN] {
        let mut bytes = [0u8; UNIT_LEN];
        bytes[..LANE_SYMBOLS].copy_from_slice(&self.symbols);
        bytes[LANE_SYMBOLS] = self.check;
        bytes
    }

    /// Parse a unit from exactly `UNIT_LEN` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != UNIT_LEN {
            return Err(Error::InvalidInput(format!(
                "protected unit must be {} bytes, got {}",
                UNIT_LEN,
                bytes.len()
            )));
        }
        let mut symbols = [0u8; LANE_SYMBOLS];
        symbols.copy_from_slice(&bytes[..LANE_SYMBOLS]);
        Ok(Self {
            symbols,
            check: bytes[LANE_SYMBOLS],
        })
    }
}

/// Result of a fast-path correction attempt on one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier2Fix {
    /// The unit after correction (unchanged when uncertain)
    pub unit: ProtectedUnit,
    /// A bit was flipped back
    pub fixed: bool,
    /// False when more than one error is indicated; do not trust `unit`
    pub certain: bool,
}

impl Tier2Fix {
    pub fn symbols(&self) -> [u8; LANE_SYMBOLS] {
        self.unit.symbols
    }
}

/// Symbols recovered from a stream of protected units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecovery {
    /// Recovered symbols, including zero padding of the final lane
    pub symbols: Vec<u8>,
    pub fixed_units: usize,
    pub uncertain_units: usize,
}

/// SECDED(72,64) lane codec
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniSyndrome;

impl MiniSyndrome {
    pub fn new() -> Self {
        MiniSyndrome
    }

    /// Attach a check byte to a lane of symbols
    pub fn protect(&self, symbols: [u8; LANE_SYMBOLS]) -> ProtectedUnit {
        let hamming = hamming_bits(&symbols);
        let ones = symbols.iter().map(|b| b.count_ones()).sum::<u32>() + hamming.count_ones();
        let parity = if ones % 2 == 1 { OVERALL_PARITY } else { 0 };
        ProtectedUnit {
            symbols,
            check: hamming | parity,
        }
    }

    /// Check a unit and correct a single flipped bit if one is indicated
    pub fn try_fix(&self, unit: ProtectedUnit) -> Tier2Fix {
        let syndrome = hamming_bits(&unit.symbols) ^ (unit.check & HAMMING_MASK);
        let ones = unit.symbols.iter().map(|b| b.count_ones()).sum::<u32>()
            + unit.check.count_ones();
        let odd = ones % 2 == 1;

        let mut corrected = unit;
        match (syndrome, odd) {
            (0, false) => Tier2Fix {
                unit,
                fixed: false,
                certain: true,
            },
            (0, true) => {
                corrected.check ^= OVERALL_PARITY;
                fixed(corrected)
            }
            (s, true) if s.is_power_of_two() => {
                corrected.check ^= s;
                fixed(corrected)
            }
            (s, true) if POSITION_TO_BIT[s as usize] != NOT_DATA => {
                let bit = POSITION_TO_BIT[s as usize] as usize;
                let bits = corrected.symbols.view_bits_mut::<Msb0>();
                let flipped = !bits[bit];
                bits.set(bit, flipped);
                fixed(corrected)
            }
            // Even parity with a nonzero syndrome, or a syndrome past the last position
            _ => Tier2Fix {
                unit,
                fixed: false,
                certain: false,
            },
        }
    }

    /// Bytes needed to protect `symbol_count` symbols
    pub fn encoded_len(&self, symbol_count: usize) -> usize {
        symbol_count.div_ceil(LANE_SYMBOLS) * UNIT_LEN
    }

    /// Protect a symbol stream lane by lane; the final lane is zero padded
    pub fn protect_stream(&self, symbols: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len(symbols.len()));
        for chunk in symbols.chunks(LANE_SYMBOLS) {
            let mut lane = [0u8; LANE_SYMBOLS];
            lane[..chunk.len()].copy_from_slice(chunk);
            out.extend_from_slice(&self.protect(lane).to_bytes());
        }
        out
    }

    /// Run `try_fix` over every unit in a stream
    pub fn recover_stream(&self, bytes: &[u8]) -> Result<StreamRecovery> {
        if bytes.len() % UNIT_LEN != 0 {
            return Err(Error::InvalidInput(format!(
                "stream length {} is not a multiple of {}",
                bytes.len(),
                UNIT_LEN
            )));
        }

        let mut recovery = StreamRecovery {
            symbols: Vec::with_capacity(bytes.len() / UNIT_LEN * LANE_SYMBOLS),
            fixed_units: 0,
            uncertain_units: 0,
        };
        for chunk in bytes.chunks_exact(UNIT_LEN) {
            let fix = self.try_fix(ProtectedUnit::from_bytes(chunk)?);
            if !fix.certain {
                recovery.uncertain_units += 1;
            } else if fix.fixed {
                recovery.fixed_units += 1;
            }
            recovery.symbols.extend_from_slice(&fix.symbols());
        }
        Ok(recovery)
    }
}

impl ErrorCorrection for MiniSyndrome {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.protect_stream(data))
    }

    /// Returns lane-padded symbols; any uncertain unit is an error
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let recovery = self.recover_stream(data)?;
        if recovery.uncertain_units > 0 {
            return Err(Error::uncorrectable(format!(
                "{} units carry more than one bit error",
                recovery.uncertain_units
            )));
        }
        Ok(recovery.symbols)
    }
}

fn fixed(unit: ProtectedUnit) -> Tier2Fix {
    Tier2Fix {
        unit,
        fixed: true,
        certain: true,
    }
}

/// XOR of the Hamming positions of every set data bit
fn hamming_bits(symbols: &[u8; LANE_SYMBOLS]) -> u8 {
    symbols
        .view_bits::<Msb0>()
        .iter_ones()
        .fold(0, |acc, bit| acc ^ DATA_POSITIONS[bit])
}
