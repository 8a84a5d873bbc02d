//! BCH systematic encoder
//!
//! Computes the parity bits as the remainder of x^(n-k) * m(x) modulo the
//! generator polynomial. The division does not shift single bits: the
//! remainder lives in three 64-bit words (n - k is at most 192 for DVB-S2),
//! message bits are ingested 64 at a time, and a precomputed 256-entry
//! feedback table folds one whole byte into the remainder per lookup. This
//! word-at-a-time data path is what makes the codec fast enough to sit in a
//! receiver chain.

use bitvec::prelude::*;

use super::{BchCode, CodeParamError, GeneratorPoly};

/// Remainder register width in 64-bit words; covers n - k up to 192 bits.
const REM_WORDS: usize = 3;

type Remainder = [u64; REM_WORDS];

/// Systematic encoder for one DVB-S2 BCH code.
///
/// Owns its generator polynomial and the derived feedback table; instances
/// are independent of any decoder. `encode` is a pure function of its
/// inputs and allocates nothing.
pub struct BchEncoder {
    code: BchCode,
    parity: usize,
    table: Vec<Remainder>,
}

impl BchEncoder {
    /// Build the encoder for a validated DVB-S2 code.
    ///
    /// Expands the generator polynomial over the code's field and
    /// precomputes the per-byte feedback table from it. The field tables are
    /// only needed here; they are dropped once the table exists.
    pub fn new(code: BchCode) -> Result<BchEncoder, CodeParamError> {
        let gf = code.field()?;
        let gpoly = GeneratorPoly::build(&code, &gf)?;
        let parity = code.parity();

        // Lower n - k coefficients of g, left-aligned so that the degree
        // n-k-1 term sits at the top bit of word 0.
        let mut gen: Remainder = [0; REM_WORDS];
        for d in 0..parity {
            if gpoly.coef(d) {
                let idx = parity - 1 - d;
                gen[idx / 64] |= 1u64 << (63 - (idx % 64));
            }
        }

        // table[b] is the remainder update caused by byte b arriving at the
        // top of the register, i.e. eight shift-and-conditional-subtract
        // steps folded into one lookup.
        let mut table = vec![[0u64; REM_WORDS]; 256];
        for (b, entry) in table.iter_mut().enumerate() {
            let mut r: Remainder = [(b as u64) << 56, 0, 0];
            for _ in 0..8 {
                let feedback = r[0] >> 63 != 0;
                r = shl1(r);
                if feedback {
                    for (rw, gw) in r.iter_mut().zip(&gen) {
                        *rw ^= gw;
                    }
                }
            }
            *entry = r;
        }

        Ok(BchEncoder {
            code,
            parity,
            table,
        })
    }

    pub fn code(&self) -> &BchCode {
        &self.code
    }

    /// Systematically encode `msg` into `codeword`.
    ///
    /// Bit 0 of either buffer is the highest-order position (the x^(n-1)
    /// coefficient), MSB-first within each byte. The message occupies
    /// `codeword[..k]` and the parity remainder `codeword[k..]`.
    ///
    /// # Arguments
    /// * `msg` - k message bits
    /// * `codeword` - caller-supplied n-bit output buffer
    pub fn encode(&self, msg: &BitSlice<u8, Msb0>, codeword: &mut BitSlice<u8, Msb0>) {
        assert_eq!(msg.len(), self.code.k, "message must be {} bits", self.code.k);
        assert_eq!(
            codeword.len(),
            self.code.n,
            "codeword must be {} bits",
            self.code.n
        );

        codeword[..self.code.k].copy_from_bitslice(msg);

        let mut r: Remainder = [0; REM_WORDS];
        let mut chunks = msg.chunks_exact(64);
        for chunk in chunks.by_ref() {
            let word = chunk.load_be::<u64>();
            for byte in word.to_be_bytes() {
                r = self.ingest(r, byte);
            }
        }
        // Every DVB-S2 k is a byte multiple, so the tail is whole bytes.
        for chunk in chunks.remainder().chunks(8) {
            r = self.ingest(r, chunk.load_be::<u8>());
        }

        for j in 0..self.parity {
            let bit = (r[j / 64] >> (63 - (j % 64))) & 1 == 1;
            codeword.set(self.code.k + j, bit);
        }
    }

    #[inline]
    fn ingest(&self, r: Remainder, byte: u8) -> Remainder {
        let idx = ((r[0] >> 56) as u8 ^ byte) as usize;
        let t = &self.table[idx];
        [
            ((r[0] << 8) | (r[1] >> 56)) ^ t[0],
            ((r[1] << 8) | (r[2] >> 56)) ^ t[1],
            (r[2] << 8) ^ t[2],
        ]
    }
}

#[inline]
fn shl1(r: Remainder) -> Remainder {
    [
        (r[0] << 1) | (r[1] >> 63),
        (r[1] << 1) | (r[2] >> 63),
        r[2] << 1,
    ]
}
