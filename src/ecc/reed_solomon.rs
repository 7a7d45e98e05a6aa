//! Reed-Solomon error correction code implementation.
//!
//! Reed-Solomon codes are a group of error-correcting codes introduced by Irving S. Reed and
//! Gustave Solomon in 1960. A code with `2t` parity symbols corrects up to `t` corrupted bytes
//! anywhere in a codeword, which makes it the burst-tolerant primary tier of the narrative codec.
//!
//! This implementation provides:
//! - Systematic encoding over GF(2^8) with generator roots α^0 .. α^(2t-1)
//! - Segment framing: each codeword's data region is `[len][payload][zero pad]`
//! - Decoding by syndrome computation, Berlekamp-Massey error locator search,
//!   Chien search for positions and Forney's algorithm for magnitudes
//! - Shortened codes (`n < 255`)

use crate::config::{FecConfig, MAX_CODEWORD_LEN};
use crate::ecc::galois::{self, GROUP_ORDER};
use crate::ecc::ErrorCorrection;
use crate::error::{Error, Result};
use log::{debug, trace};

/// Syndromes of a received codeword, `S_j = r(α^j)` for `j in 0..2t`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syndromes(Vec<u8>);

impl Syndromes {
    /// True when every syndrome is zero, i.e. the codeword is error-free
    pub fn is_clean(&self) -> bool {
        self.0.iter().all(|&s| s == 0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Outcome of decoding a single codeword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDecode {
    /// Unframed segment payload (best effort when `success` is false)
    pub data: Vec<u8>,
    /// Bytes corrected by the locator/magnitude pipeline
    pub corrected: usize,
    pub success: bool,
}

/// Outcome of decoding a run of codewords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier1Decode {
    /// Concatenated segment payloads; do not use when `success` is false
    pub data: Vec<u8>,
    pub corrected_count: usize,
    /// Logical AND across all segments
    pub success: bool,
    /// Indices of segments that could not be restored
    pub failed_segments: Vec<usize>,
}

/// Reed-Solomon encoder/decoder for error correction
#[derive(Debug, Clone)]
pub struct ReedSolomon {
    /// Codeword length `n`
    codeword_len: usize,
    /// Maximum correctable byte errors `t`
    correction_capacity: usize,
    /// Generator polynomial, highest degree first, monic
    generator: Vec<u8>,
}

impl ReedSolomon {
    /// Create a new Reed-Solomon codec
    ///
    /// # Arguments
    /// * `codeword_len` - Total bytes per codeword (at most 255)
    /// * `correction_capacity` - Byte errors correctable per codeword
    ///
    /// # Errors
    /// Returns an error if the parameters leave fewer than two data bytes
    pub fn new(codeword_len: usize, correction_capacity: usize) -> Result<Self> {
        if correction_capacity == 0 {
            return Err(Error::InvalidInput(
                "Correction capacity must be positive".to_string(),
            ));
        }

        if codeword_len > MAX_CODEWORD_LEN {
            return Err(Error::InvalidInput(format!(
                "Codeword length must be at most {}",
                MAX_CODEWORD_LEN
            )));
        }

        let parity_len = correction_capacity.checked_mul(2).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Correction capacity {} is out of range",
                correction_capacity
            ))
        })?;
        if codeword_len.saturating_sub(parity_len) < 2 {
            return Err(Error::InvalidInput(format!(
                "Codeword length {} leaves no data room after {} parity bytes",
                codeword_len, parity_len
            )));
        }

        Ok(ReedSolomon {
            codeword_len,
            correction_capacity,
            generator: generator_poly(parity_len),
        })
    }

    /// Create the codec described by a validated configuration
    pub fn from_config(config: &FecConfig) -> Result<Self> {
        Self::new(config.codeword_len, config.correction_capacity)
    }

    pub fn codeword_len(&self) -> usize {
        self.codeword_len
    }

    pub fn correction_capacity(&self) -> usize {
        self.correction_capacity
    }

    pub fn parity_len(&self) -> usize {
        2 * self.correction_capacity
    }

    /// Data bytes per codeword (`k`)
    pub fn data_len(&self) -> usize {
        self.codeword_len - self.parity_len()
    }

    /// Payload bytes a framed segment can carry (`k` minus the length prefix)
    pub fn segment_payload(&self) -> usize {
        self.data_len() - 1
    }

    /// Number of codewords needed to carry `len` payload bytes
    pub fn segments_for(&self, len: usize) -> usize {
        len.div_ceil(self.segment_payload()).max(1)
    }

    /// Encode exactly `k` data bytes into one systematic codeword
    pub fn encode_codeword(&self, data: &[u8]) -> Result<Vec<u8>> {
        let data_len = self.data_len();
        if data.len() != data_len {
            return Err(Error::InvalidInput(format!(
                "Data size must be exactly {}",
                data_len
            )));
        }

        // Synthetic division of data(x) * x^2t by the generator leaves the parity
        let mut codeword = vec![0u8; self.codeword_len];
        codeword[..data_len].copy_from_slice(data);
        for i in 0..data_len {
            let coef = codeword[i];
            if coef == 0 {
                continue;
            }
            for (j, &gen) in self.generator.iter().enumerate().skip(1) {
                codeword[i + j] ^= galois::mul(gen, coef);
            }
        }
        codeword[..data_len].copy_from_slice(data);

        Ok(codeword)
    }

    /// Frame and encode caller-chosen chunks, one codeword per chunk
    pub fn encode_segments<'a, I>(&self, chunks: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let capacity = self.segment_payload();
        let mut out = Vec::new();
        let mut region = vec![0u8; self.data_len()];

        for chunk in chunks {
            if chunk.len() > capacity {
                return Err(Error::InputTooLarge {
                    length: chunk.len(),
                    max_length: capacity,
                });
            }
            region.fill(0);
            region[0] = chunk.len() as u8;
            region[1..=chunk.len()].copy_from_slice(chunk);
            out.extend_from_slice(&self.encode_codeword(&region)?);
        }

        Ok(out)
    }

    /// Encode arbitrary data, splitting it across as many codewords as needed
    ///
    /// Deterministic: identical input always yields identical output.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return self.encode_segments(std::iter::once(data));
        }
        self.encode_segments(data.chunks(self.segment_payload()))
    }

    /// Compute the 2t syndromes of one codeword
    pub fn syndromes(&self, codeword: &[u8]) -> Syndromes {
        Syndromes(
            (0..self.parity_len())
                .map(|j| galois::eval_descending(codeword, galois::alpha_pow(j)))
                .collect(),
        )
    }

    /// Locate and correct errors in place, returning how many bytes changed
    ///
    /// # Errors
    /// `UncorrectableBlock` when the locator finds more than `t` errors, the
    /// locator roots are inconsistent, or the corrected word still fails the
    /// syndrome check. The codeword may be partially modified in that case.
    pub fn correct(&self, codeword: &mut [u8], syndromes: &Syndromes) -> Result<usize> {
        if codeword.len() != self.codeword_len {
            return Err(Error::uncorrectable(format!(
                "codeword is {} bytes, expected {}",
                codeword.len(),
                self.codeword_len
            )));
        }
        if syndromes.is_clean() {
            return Ok(0);
        }

        let locator = berlekamp_massey(syndromes.as_slice())?;
        let error_count = locator.len() - 1;
        if error_count > self.correction_capacity {
            return Err(Error::uncorrectable(format!(
                "{} errors located, capacity is {}",
                error_count, self.correction_capacity
            )));
        }

        let positions = self.chien_search(&locator);
        if positions.len() != error_count {
            return Err(Error::uncorrectable(format!(
                "locator of degree {} has {} roots in the codeword",
                error_count,
                positions.len()
            )));
        }

        let magnitudes = self.forney(syndromes.as_slice(), &locator, &positions)?;
        for (&pos, &magnitude) in positions.iter().zip(magnitudes.iter()) {
            codeword[pos] ^= magnitude;
        }

        if !self.syndromes(codeword).is_clean() {
            return Err(Error::uncorrectable(
                "syndromes remain nonzero after correction",
            ));
        }

        trace!("corrected {} bytes at {:?}", positions.len(), positions);
        Ok(positions.len())
    }

    /// Decode one codeword and strip its framing
    ///
    /// # Errors
    /// `UncorrectableBlock` only for a codeword of the wrong length; a
    /// codeword with too many errors yields `success = false` instead.
    pub fn decode_segment(&self, codeword: &[u8]) -> Result<SegmentDecode> {
        if codeword.len() != self.codeword_len {
            return Err(Error::uncorrectable(format!(
                "codeword is {} bytes, expected {}",
                codeword.len(),
                self.codeword_len
            )));
        }

        let mut buffer = codeword.to_vec();
        let syndromes = self.syndromes(&buffer);
        let (corrected, success) = match self.correct(&mut buffer, &syndromes) {
            Ok(corrected) => (corrected, true),
            Err(err) => {
                debug!("tier-1 segment decode failed: {}", err);
                buffer.copy_from_slice(codeword);
                (0, false)
            }
        };

        Ok(self.finish_segment(&buffer, corrected, success))
    }

    /// Unframe a (possibly corrected) codeword into a segment result
    pub(crate) fn finish_segment(
        &self,
        codeword: &[u8],
        corrected: usize,
        success: bool,
    ) -> SegmentDecode {
        let region = &codeword[..self.data_len()];
        match self.unframe(region) {
            Ok(payload) => SegmentDecode {
                data: payload.to_vec(),
                corrected,
                success,
            },
            Err(err) => {
                debug!("segment framing rejected: {}", err);
                SegmentDecode {
                    data: region[1..].to_vec(),
                    corrected,
                    success: false,
                }
            }
        }
    }

    /// Decode a run of concatenated codewords
    ///
    /// Segments are decoded independently; one segment's failure does not
    /// block the others, but `success` is false if any segment failed.
    ///
    /// # Errors
    /// `UncorrectableBlock` if the input is empty or not a whole number of codewords
    pub fn decode(&self, codewords: &[u8]) -> Result<Tier1Decode> {
        if codewords.is_empty() || codewords.len() % self.codeword_len != 0 {
            return Err(Error::uncorrectable(format!(
                "payload length {} is not a positive multiple of {}",
                codewords.len(),
                self.codeword_len
            )));
        }

        let mut result = Tier1Decode {
            data: Vec::with_capacity(codewords.len()),
            corrected_count: 0,
            success: true,
            failed_segments: Vec::new(),
        };

        for (index, codeword) in codewords.chunks(self.codeword_len).enumerate() {
            let segment = self.decode_segment(codeword)?;
            result.data.extend_from_slice(&segment.data);
            result.corrected_count += segment.corrected;
            if !segment.success {
                result.success = false;
                result.failed_segments.push(index);
            }
        }

        Ok(result)
    }

    /// Read the payload out of a `[len][payload][pad]` data region
    pub fn unframe<'a>(&self, region: &'a [u8]) -> Result<&'a [u8]> {
        let len = region.first().copied().unwrap_or(0) as usize;
        if region.is_empty() || len > region.len() - 1 {
            return Err(Error::uncorrectable(format!(
                "segment length prefix {} exceeds capacity {}",
                len,
                region.len().saturating_sub(1)
            )));
        }
        Ok(&region[1..=len])
    }

    /// Positions (codeword indices) whose locator `X^-1` is a root of Λ
    fn chien_search(&self, locator: &[u8]) -> Vec<usize> {
        (0..self.codeword_len)
            .filter(|&pos| {
                let x_inv = galois::alpha_pow(GROUP_ORDER - self.degree_at(pos));
                galois::eval_ascending(locator, x_inv) == 0
            })
            .collect()
    }

    /// Error magnitudes `Y = X * Ω(X^-1) / Λ'(X^-1)` for generator roots starting at α^0
    fn forney(&self, syndromes: &[u8], locator: &[u8], positions: &[usize]) -> Result<Vec<u8>> {
        let parity_len = syndromes.len();

        // Ω(x) = S(x) Λ(x) mod x^2t
        let mut evaluator = vec![0u8; parity_len];
        for (i, &s) in syndromes.iter().enumerate() {
            for (j, &l) in locator.iter().enumerate().take(parity_len - i) {
                evaluator[i + j] ^= galois::mul(s, l);
            }
        }

        // Formal derivative in characteristic 2 keeps only odd-degree terms
        let derivative: Vec<u8> = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &coef)| if i % 2 == 1 { coef } else { 0 })
            .collect();

        positions
            .iter()
            .map(|&pos| {
                let degree = self.degree_at(pos);
                let x = galois::alpha_pow(degree);
                let x_inv = galois::alpha_pow(GROUP_ORDER - degree);
                let denominator = galois::eval_ascending(&derivative, x_inv);
                if denominator == 0 {
                    return Err(Error::uncorrectable("error locator has a repeated root"));
                }
                let numerator = galois::mul(x, galois::eval_ascending(&evaluator, x_inv));
                galois::div(numerator, denominator)
            })
            .collect()
    }

    /// Polynomial degree of the coefficient stored at codeword index `pos`
    fn degree_at(&self, pos: usize) -> usize {
        self.codeword_len - 1 - pos
    }
}

impl ErrorCorrection for ReedSolomon {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        ReedSolomon::encode(self, data)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let decoded = ReedSolomon::decode(self, data)?;
        if !decoded.success {
            return Err(Error::uncorrectable(format!(
                "segments {:?} exceed correction capacity",
                decoded.failed_segments
            )));
        }
        Ok(decoded.data)
    }
}

/// g(x) = (x + α^0)(x + α^1)...(x + α^(2t-1)), highest degree first
fn generator_poly(parity_len: usize) -> Vec<u8> {
    (0..parity_len).fold(vec![1u8], |g, i| {
        galois::poly_mul(&g, &[1, galois::alpha_pow(i)])
    })
}

/// Berlekamp-Massey search for the shortest LFSR generating the syndromes.
///
/// Returns the error locator Λ(x) lowest degree first, truncated to `L + 1`
/// coefficients where `L` is the register length.
fn berlekamp_massey(syndromes: &[u8]) -> Result<Vec<u8>> {
    let n = syndromes.len();
    let mut locator = vec![0u8; n + 1];
    locator[0] = 1;
    let mut previous = locator.clone();

    let mut length = 0;
    let mut shift = 1;
    let mut previous_discrepancy = 1u8;

    for r in 0..n {
        let mut discrepancy = syndromes[r];
        for i in 1..=length {
            discrepancy ^= galois::mul(locator[i], syndromes[r - i]);
        }

        if discrepancy == 0 {
            shift += 1;
            continue;
        }

        let scale = galois::div(discrepancy, previous_discrepancy)?;
        let snapshot = locator.clone();
        for (i, &coef) in previous.iter().enumerate() {
            if coef != 0 && i + shift <= n {
                locator[i + shift] ^= galois::mul(scale, coef);
            }
        }

        if 2 * length <= r {
            length = r + 1 - length;
            previous = snapshot;
            previous_discrepancy = discrepancy;
            shift = 1;
        } else {
            shift += 1;
        }
    }

    locator.truncate(length + 1);
    Ok(locator)
}
