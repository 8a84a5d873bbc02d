//! GF(2^m) arithmetic tables
//!
//! Log/antilog tables for a primitive element α of the Galois field used by
//! the BCH codec. The tables are built once from a primitive polynomial and
//! owned by the consumer; all arithmetic after construction is table lookups.
//!
//! Zero is not a power of α and has no logarithm, so every operation that
//! touches the log table handles zero explicitly.

use snafu::{ensure, Snafu};

/// Field order for short FECFRAMEs (mother code length 2^14 - 1).
pub const GF_M_SHORT: u32 = 14;

/// Field order for normal FECFRAMEs (mother code length 2^16 - 1).
pub const GF_M_NORMAL: u32 = 16;

/// 1 + x + x^3 + x^5 + x^14, coefficients little-endian by power.
pub const PRIM_POLY_M14: u32 = 0x402B;

/// 1 + x^2 + x^3 + x^5 + x^16.
pub const PRIM_POLY_M16: u32 = 0x1002D;

/// Sentinel stored in the log table for the zero element.
const NO_LOG: i32 = -1;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum GfError {
    #[snafu(display("field order m = {m} is outside the supported range 2..=16"))]
    UnsupportedOrder { m: u32 },

    #[snafu(display("polynomial {poly:#x} does not have degree {m}"))]
    DegreeMismatch { poly: u32, m: u32 },

    #[snafu(display("polynomial {poly:#x} is not primitive over GF(2)"))]
    NotPrimitive { poly: u32 },
}

/// Log/antilog tables for GF(2^m).
///
/// `alpha_to[i]` holds α^i as an m-bit integer for i in [0, 2^m - 2];
/// `index_of[x]` holds log_α(x) for nonzero x. Elements are m-bit integers
/// stored in `u16`, which covers both DVB-S2 fields (m = 14 and m = 16).
pub struct GfTables {
    m: u32,
    order: usize,
    alpha_to: Vec<u16>,
    index_of: Vec<i32>,
}

impl GfTables {
    /// Build the tables for GF(2^m) from a primitive polynomial.
    ///
    /// The polynomial is given with coefficients little-endian by power, so
    /// bit `m` must be set. Construction walks α^0, α^1, ... by multiplying
    /// by x and reducing modulo the polynomial whenever the m-th bit comes
    /// up, and fails if the walk does not visit every nonzero element.
    pub fn new(m: u32, prim_poly: u32) -> Result<GfTables, GfError> {
        ensure!((2..=16).contains(&m), UnsupportedOrderSnafu { m });
        ensure!(
            prim_poly >> m == 1,
            DegreeMismatchSnafu { poly: prim_poly, m }
        );

        let size = 1usize << m;
        let order = size - 1;
        let mut alpha_to = vec![0u16; size];
        let mut index_of = vec![NO_LOG; size];

        let mut x: u32 = 1;
        for i in 0..order {
            alpha_to[i] = x as u16;
            index_of[x as usize] = i as i32;
            x <<= 1;
            if x & (1 << m) != 0 {
                x ^= prim_poly;
            }
        }
        // A primitive polynomial closes the cycle only after all 2^m - 1
        // nonzero elements have been visited.
        ensure!(x == 1, NotPrimitiveSnafu { poly: prim_poly });

        Ok(GfTables {
            m,
            order,
            alpha_to,
            index_of,
        })
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    /// Multiplicative order of the field, 2^m - 1.
    pub fn order(&self) -> usize {
        self.order
    }

    /// α^e, with the exponent taken modulo 2^m - 1.
    #[inline]
    pub fn alpha_pow(&self, e: usize) -> u16 {
        self.alpha_to[e % self.order]
    }

    /// log_α(x), or `None` for the zero element.
    #[inline]
    pub fn log(&self, x: u16) -> Option<usize> {
        match self.index_of[x as usize] {
            NO_LOG => None,
            l => Some(l as usize),
        }
    }

    /// Galois multiplication. Zero factors short-circuit to zero.
    #[inline]
    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let log = self.index_of[a as usize] as usize + self.index_of[b as usize] as usize;
        self.alpha_to[log % self.order]
    }

    /// Multiplicative inverse. Panics on zero, which has none.
    #[inline]
    pub fn inv(&self, a: u16) -> u16 {
        assert!(a != 0, "inverse of the zero element");
        let log = self.index_of[a as usize] as usize;
        self.alpha_to[(self.order - log) % self.order]
    }
}
