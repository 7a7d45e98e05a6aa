//! Finite field arithmetic in GF(2^8).
//!
//! Elements are bytes. Addition is XOR; multiplication and division go
//! through exponent/logarithm tables generated at compile time from the
//! primitive polynomial x^8 + x^4 + x^3 + x^2 + 1 with α = 2.

use crate::error::{Error, Result};

/// Primitive polynomial for GF(2^8) field operations: x^8 + x^4 + x^3 + x^2 + 1 (0x11D)
const PRIMITIVE_POLY: u16 = 0x11D;

/// Order of the multiplicative group (2^8 - 1)
pub const GROUP_ORDER: usize = 255;

struct Tables {
    /// α^i for i in 0..510, doubled so `log a + log b` never needs a modulo
    exp: [u8; 2 * GROUP_ORDER],
    /// log_α(x); entry 0 is unused
    log: [u8; 256],
}

static TABLES: Tables = build_tables();

const fn build_tables() -> Tables {
    let mut exp = [0u8; 2 * GROUP_ORDER];
    let mut log = [0u8; 256];

    let mut x: u16 = 1;
    let mut i = 0;
    while i < GROUP_ORDER {
        exp[i] = x as u8;
        exp[i + GROUP_ORDER] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE_POLY;
        }
        i += 1;
    }

    Tables { exp, log }
}

/// Add (and subtract) two field elements
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Multiply two field elements
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    TABLES.exp[TABLES.log[a as usize] as usize + TABLES.log[b as usize] as usize]
}

/// Divide `a` by `b`
pub fn div(a: u8, b: u8) -> Result<u8> {
    if b == 0 {
        return Err(Error::InvalidInput(
            "Cannot divide by zero in GF(2^8)".to_string(),
        ));
    }
    if a == 0 {
        return Ok(0);
    }
    let exponent =
        TABLES.log[a as usize] as usize + GROUP_ORDER - TABLES.log[b as usize] as usize;
    Ok(TABLES.exp[exponent])
}

/// Multiplicative inverse
pub fn inverse(a: u8) -> Result<u8> {
    div(1, a)
}

/// α raised to `power`; any non-negative exponent is reduced mod 255
#[inline]
pub fn alpha_pow(power: usize) -> u8 {
    TABLES.exp[power % GROUP_ORDER]
}

/// Discrete logarithm base α; `None` for zero
pub fn log(a: u8) -> Option<usize> {
    if a == 0 {
        None
    } else {
        Some(TABLES.log[a as usize] as usize)
    }
}

/// Evaluate a polynomial stored highest-degree first (codeword order)
pub fn eval_descending(poly: &[u8], x: u8) -> u8 {
    poly.iter().fold(0, |acc, &coef| mul(acc, x) ^ coef)
}

/// Evaluate a polynomial stored lowest-degree first
pub fn eval_ascending(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0, |acc, &coef| mul(acc, x) ^ coef)
}

/// Product of two polynomials stored highest-degree first
pub fn poly_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] ^= mul(ai, bj);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Carry-less multiply with reduction, independent of the tables
    fn slow_mul(a: u8, b: u8) -> u8 {
        let mut result: u16 = 0;
        let mut a = a as u16;
        let mut b = b;
        while b > 0 {
            if b & 1 != 0 {
                result ^= a;
            }
            b >>= 1;
            a <<= 1;
            if a & 0x100 != 0 {
                a ^= PRIMITIVE_POLY;
            }
        }
        result as u8
    }

    #[test]
    fn test_tables_match_shift_and_add() {
        for a in 0..=255u8 {
            for b in [0u8, 1, 2, 3, 0x53, 0x8e, 0xca, 0xff] {
                assert_eq!(mul(a, b), slow_mul(a, b), "{a} * {b}");
            }
        }
    }

    #[test]
    fn test_alpha_generates_group() {
        let mut seen = [false; 256];
        for i in 0..GROUP_ORDER {
            let value = alpha_pow(i);
            assert!(!seen[value as usize], "α^{i} repeats");
            seen[value as usize] = true;
        }
        assert!(!seen[0]);
        assert_eq!(alpha_pow(GROUP_ORDER), 1);
    }

    #[test]
    fn test_inverse() {
        assert_eq!(inverse(1).unwrap(), 1);
        for a in 1..=255u8 {
            let inv = inverse(a).unwrap();
            assert_eq!(mul(a, inv), 1);
        }
        assert!(inverse(0).is_err());
        assert_eq!(div(0, 7).unwrap(), 0);
        assert_eq!(log(0), None);
        assert_eq!(log(2), Some(1));
    }

    #[test]
    fn test_polynomial_evaluation() {
        // (x + 1)(x + 2) = x^2 + 3x + 2
        let product = poly_mul(&[1, 1], &[1, 2]);
        assert_eq!(product, vec![1, 3, 2]);
        assert_eq!(eval_descending(&product, 1), 0);
        assert_eq!(eval_descending(&product, 2), 0);

        let ascending: Vec<u8> = product.iter().rev().copied().collect();
        for x in 0..=255u8 {
            assert_eq!(eval_ascending(&ascending, x), eval_descending(&product, x));
        }
        assert_eq!(add(0x53, 0xca), 0x53 ^ 0xca);
    }
}
