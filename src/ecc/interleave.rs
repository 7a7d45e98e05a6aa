//! Block interleaver for codeword runs.
//!
//! Codewords are written as the rows of a matrix and read out column by
//! column, so byte `i` of every codeword is transmitted before byte `i + 1`
//! of any of them. A contiguous burst of `b` corrupted bytes then lands as at
//! most `ceil(b / rows)` errors in each codeword.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInterleaver {
    /// Number of codewords
    rows: usize,
    /// Codeword length
    cols: usize,
}

impl BlockInterleaver {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidInput(
                "Interleaver dimensions must be positive".to_string(),
            ));
        }
        Ok(Self { rows, cols })
    }

    /// Interleaver for a payload made of whole `codeword_len` codewords
    pub fn for_payload(len: usize, codeword_len: usize) -> Result<Self> {
        if codeword_len == 0 || len % codeword_len != 0 {
            return Err(Error::uncorrectable(format!(
                "payload length {} is not a multiple of {}",
                len, codeword_len
            )));
        }
        Self::new(len / codeword_len, codeword_len)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major in, column-major out
    pub fn interleave(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.check_len(data)?;
        let mut out = vec![0u8; data.len()];
        for (i, &byte) in data.iter().enumerate() {
            let (row, col) = (i / self.cols, i % self.cols);
            out[col * self.rows + row] = byte;
        }
        Ok(out)
    }

    /// Inverse of [`interleave`](Self::interleave)
    pub fn deinterleave(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.check_len(data)?;
        let mut out = vec![0u8; data.len()];
        for (i, &byte) in data.iter().enumerate() {
            let (col, row) = (i / self.rows, i % self.rows);
            out[row * self.cols + col] = byte;
        }
        Ok(out)
    }

    fn check_len(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.len() {
            return Err(Error::InvalidInput(format!(
                "Interleaver expects {} bytes, got {}",
                self.len(),
                data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_layout() {
        let interleaver = BlockInterleaver::new(2, 3).unwrap();
        let data = [1, 2, 3, 4, 5, 6];
        let interleaved = interleaver.interleave(&data).unwrap();
        assert_eq!(interleaved, vec![1, 4, 2, 5, 3, 6]);
        assert_eq!(interleaver.deinterleave(&interleaved).unwrap(), data);
    }

    #[test]
    fn test_burst_is_spread_across_rows() {
        let interleaver = BlockInterleaver::new(4, 10).unwrap();
        let mut burst = vec![0u8; 40];
        for byte in burst.iter_mut().skip(8).take(8) {
            *byte = 1;
        }

        let rows = interleaver.deinterleave(&burst).unwrap();
        for row in rows.chunks(10) {
            assert_eq!(row.iter().filter(|&&b| b == 1).count(), 2);
        }
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(BlockInterleaver::new(0, 5).is_err());
        assert!(BlockInterleaver::for_payload(10, 4).is_err());
        assert_eq!(BlockInterleaver::for_payload(12, 4).unwrap().len(), 12);

        let interleaver = BlockInterleaver::new(2, 2).unwrap();
        assert!(interleaver.interleave(&[1, 2, 3]).is_err());
        assert!(!interleaver.is_empty());
    }
}
