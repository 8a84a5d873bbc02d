//! DVB-S2 outer BCH codec
//!
//! Systematic BCH encoding and hard-decision decoding for the outer FEC of
//! DVB-S2 FECFRAMEs.
//!
//! **Code family**:
//! - Normal FECFRAMEs use a mother code of length 2^16 - 1 over GF(2^16)
//!   built on 1 + x^2 + x^3 + x^5 + x^16.
//! - Short FECFRAMEs use a mother code of length 2^14 - 1 over GF(2^14)
//!   built on 1 + x + x^3 + x^5 + x^14.
//! - The transmitted code is a shortened BCH; the (n, k, t) triples are the
//!   enumerated standard table and nothing else is accepted.
//!
//! **Module Organization**:
//! - `encoder` - packed-word systematic encoder
//! - `decoder` - syndrome / Berlekamp-Massey / Chien hard-decision decoder

pub mod decoder;
pub mod encoder;

pub use decoder::{BchDecoder, DecodeOutcome};
pub use encoder::BchEncoder;

use bitvec::prelude::*;
use snafu::{ensure, Snafu};

use crate::gf::{GfError, GfTables, GF_M_NORMAL, GF_M_SHORT, PRIM_POLY_M14, PRIM_POLY_M16};

/// Every (n, k, t) BCH triple defined by DVB-S2, normal FECFRAMEs first.
pub const DVBS2_CODES: [(usize, usize, usize); 21] = [
    // normal FECFRAME (64800-bit LDPC frames)
    (16200, 16008, 12),
    (21600, 21408, 12),
    (25920, 25728, 12),
    (32400, 32208, 12),
    (38880, 38688, 12),
    (43200, 43040, 10),
    (48600, 48408, 12),
    (51840, 51648, 12),
    (54000, 53840, 10),
    (57600, 57472, 8),
    (58320, 58192, 8),
    // short FECFRAME (16200-bit LDPC frames)
    (3240, 3072, 12),
    (5400, 5232, 12),
    (6480, 6312, 12),
    (7200, 7032, 12),
    (9720, 9552, 12),
    (10800, 10632, 12),
    (11880, 11712, 12),
    (12600, 12432, 12),
    (13320, 13152, 12),
    (14400, 14232, 12),
];

#[derive(Debug, Snafu)]
pub enum CodeParamError {
    #[snafu(display("({n}, {k}, t = {t}) is not a DVB-S2 BCH code"))]
    UnknownCode { n: usize, k: usize, t: usize },

    #[snafu(display("field table construction failed: {source}"))]
    Field { source: GfError },

    #[snafu(display("generator polynomial has degree {got}, expected {expected}"))]
    GeneratorDegree { got: usize, expected: usize },
}

/// Parameters of one DVB-S2 BCH code.
///
/// `n` is the codeword length in bits, `k` the message length, `t` the
/// guaranteed correction capability, and `m` the field order (14 for short
/// FECFRAMEs, 16 for normal ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BchCode {
    pub n: usize,
    pub k: usize,
    pub t: usize,
    pub m: u32,
}

impl BchCode {
    /// Look up an (n, k, t) triple in the DVB-S2 table.
    ///
    /// Anything outside the table is a construction error; the codec never
    /// runs with parameters the standard does not define.
    pub fn new(n: usize, k: usize, t: usize) -> Result<BchCode, CodeParamError> {
        ensure!(
            DVBS2_CODES.contains(&(n, k, t)),
            UnknownCodeSnafu { n, k, t }
        );
        let m = if n < 16200 { GF_M_SHORT } else { GF_M_NORMAL };
        Ok(BchCode { n, k, t, m })
    }

    /// Number of parity bits, n - k.
    pub fn parity(&self) -> usize {
        self.n - self.k
    }

    /// The primitive polynomial of the mother-code field.
    pub fn prim_poly(&self) -> u32 {
        if self.m == GF_M_SHORT {
            PRIM_POLY_M14
        } else {
            PRIM_POLY_M16
        }
    }

    /// Build the field tables for this code.
    pub fn field(&self) -> Result<GfTables, CodeParamError> {
        GfTables::new(self.m, self.prim_poly()).map_err(|source| CodeParamError::Field { source })
    }
}

/// Binary generator polynomial of a DVB-S2 BCH code.
///
/// `coef(i)` is g_i with coefficients little-endian by power; the degree is
/// exactly n - k and g_0 = g_{n-k} = 1. g(x) is the product over GF(2) of
/// the minimal polynomials of α, α^3, ..., α^(2t-1).
pub struct GeneratorPoly {
    coefs: BitVec<u8, Msb0>,
}

impl GeneratorPoly {
    /// Multiply out the minimal polynomials of the odd α powers.
    ///
    /// For each odd i in 1..2t that an earlier conjugacy class has not
    /// already absorbed, the minimal polynomial is expanded as the product
    /// of (x + α^c) over the class {i, 2i, 4i, ...} (mod 2^m - 1). Its
    /// coefficients land back in GF(2), and the running product over GF(2)
    /// becomes g(x).
    pub fn build(code: &BchCode, gf: &GfTables) -> Result<GeneratorPoly, CodeParamError> {
        let order = gf.order();
        let mut absorbed = vec![false; order];

        let mut g: BitVec<u8, Msb0> = BitVec::repeat(false, 1);
        g.set(0, true);

        for i in (1..2 * code.t).step_by(2) {
            if absorbed[i] {
                continue;
            }

            let mut class = Vec::new();
            let mut c = i;
            loop {
                absorbed[c] = true;
                class.push(c);
                c = (2 * c) % order;
                if c == i {
                    break;
                }
            }

            // Minimal polynomial of alpha^i, expanded over GF(2^m).
            let mut min_poly: Vec<u16> = vec![1];
            for &c in &class {
                let a = gf.alpha_pow(c);
                let mut next = vec![0u16; min_poly.len() + 1];
                for (j, &coef) in min_poly.iter().enumerate() {
                    next[j + 1] ^= coef;
                    next[j] ^= gf.mul(coef, a);
                }
                min_poly = next;
            }
            debug_assert!(
                min_poly.iter().all(|&c| c <= 1),
                "minimal polynomial must have binary coefficients"
            );

            // g(x) *= min_poly(x) over GF(2).
            let mut next: BitVec<u8, Msb0> = BitVec::repeat(false, g.len() + min_poly.len() - 1);
            for j in g.iter_ones() {
                for (d, &mc) in min_poly.iter().enumerate() {
                    if mc != 0 {
                        let cur = next[j + d];
                        next.set(j + d, !cur);
                    }
                }
            }
            g = next;
        }

        ensure!(
            g.len() == code.parity() + 1,
            GeneratorDegreeSnafu {
                got: g.len() - 1,
                expected: code.parity(),
            }
        );
        debug_assert!(g[0] && g[code.parity()]);

        Ok(GeneratorPoly { coefs: g })
    }

    pub fn degree(&self) -> usize {
        self.coefs.len() - 1
    }

    /// g_i, the coefficient of x^i.
    #[inline]
    pub fn coef(&self, i: usize) -> bool {
        self.coefs[i]
    }

    /// Coefficient vector, little-endian by power.
    pub fn as_bitslice(&self) -> &BitSlice<u8, Msb0> {
        &self.coefs
    }
}
