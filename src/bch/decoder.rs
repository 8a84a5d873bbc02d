//! BCH hard-decision decoder
//!
//! Syndrome computation, Berlekamp-Massey, Chien search, and correction for
//! the shortened DVB-S2 BCH codes.
//!
//! **Pipeline**:
//! 1. Syndromes S_1..S_2t evaluated at the odd powers of α directly from
//!    the set bits of the packed word; even syndromes by squaring.
//! 2. Berlekamp-Massey builds the minimal error locator σ(x). The binary
//!    code makes every even-step discrepancy vanish, so those iterations
//!    fall through.
//! 3. Chien search counts the roots σ(α^(-j)) over the n shortened
//!    positions; a count different from deg σ is a decode failure.
//! 4. Located bits are flipped and the syndromes recomputed; any residue
//!    is a decode failure and the flips are rolled back.
//!
//! A failed decode is a normal return value. The caller gets the
//! (uncorrected) systematic bits either way and may pass them through.

use bitvec::prelude::*;
use tracing::debug;

use crate::gf::GfTables;

use super::{BchCode, CodeParamError};

/// Result of one decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Number of bit errors corrected. Zero when the word was already a
    /// codeword, and zero on failure.
    pub corrected: usize,
    /// False when the received word is uncorrectable.
    pub ok: bool,
}

/// Hard-decision decoder for one DVB-S2 BCH code.
///
/// Owns its field tables and every scratch buffer the pipeline needs; the
/// hot path allocates nothing. Independent of any encoder instance.
pub struct BchDecoder {
    code: BchCode,
    gf: GfTables,
    /// S_1..S_2t; index i holds S_{i+1}.
    syndromes: Vec<u16>,
    /// Error locator σ(x) and the Berlekamp-Massey shadow polynomials.
    sigma: Vec<u16>,
    prev: Vec<u16>,
    scratch: Vec<u16>,
    err_pos: Vec<usize>,
    /// Working copy of the received word.
    work: BitVec<u8, Msb0>,
}

impl BchDecoder {
    pub fn new(code: BchCode) -> Result<BchDecoder, CodeParamError> {
        let gf = code.field()?;
        let t2 = 2 * code.t;
        Ok(BchDecoder {
            code,
            gf,
            syndromes: vec![0; t2],
            sigma: vec![0; t2 + 2],
            prev: vec![0; t2 + 2],
            scratch: vec![0; t2 + 2],
            err_pos: Vec::with_capacity(code.t),
            work: BitVec::repeat(false, code.n),
        })
    }

    pub fn code(&self) -> &BchCode {
        &self.code
    }

    /// Decode n hard bits into k message bits.
    ///
    /// # Arguments
    /// * `rx` - n received hard bits, systematic layout as produced by the
    ///   encoder (bit 0 is the x^(n-1) coefficient)
    /// * `msg` - caller-supplied k-bit output buffer
    ///
    /// # Returns
    /// The corrected-bit count and success flag. On failure `msg` still
    /// receives the uncorrected systematic bits.
    pub fn decode(
        &mut self,
        rx: &BitSlice<u8, Msb0>,
        msg: &mut BitSlice<u8, Msb0>,
    ) -> DecodeOutcome {
        assert_eq!(rx.len(), self.code.n, "received word must be {} bits", self.code.n);
        self.work.copy_from_bitslice(rx);
        self.decode_work(msg)
    }

    /// Soft-input adapter: hard-decide LLRs at the boundary, then decode.
    ///
    /// A negative LLR maps to bit 1, zero and positive map to bit 0; no
    /// soft information crosses into the algebraic decoder.
    pub fn decode_soft(&mut self, llr: &[f32], msg: &mut BitSlice<u8, Msb0>) -> DecodeOutcome {
        assert_eq!(llr.len(), self.code.n, "LLR buffer must be {} entries", self.code.n);
        for (i, &l) in llr.iter().enumerate() {
            self.work.set(i, l < 0.0);
        }
        self.decode_work(msg)
    }

    fn decode_work(&mut self, msg: &mut BitSlice<u8, Msb0>) -> DecodeOutcome {
        assert_eq!(msg.len(), self.code.k, "message buffer must be {} bits", self.code.k);

        if !self.compute_syndromes() {
            msg.copy_from_bitslice(&self.work[..self.code.k]);
            return DecodeOutcome {
                corrected: 0,
                ok: true,
            };
        }

        let l = self.berlekamp_massey();
        let ok = l <= self.code.t && self.chien_search(l) && self.correct_and_verify();

        if ok {
            debug!(errors = l, "corrected codeword");
        } else {
            debug!(locator_degree = l, "decode failure");
        }

        msg.copy_from_bitslice(&self.work[..self.code.k]);
        DecodeOutcome {
            corrected: if ok { l } else { 0 },
            ok,
        }
    }

    /// Fill S_1..S_2t from the working copy; true if any syndrome is
    /// nonzero.
    fn compute_syndromes(&mut self) -> bool {
        let t2 = 2 * self.code.t;
        let n1 = self.code.n - 1;
        let order = self.gf.order();
        self.syndromes.fill(0);

        // Odd syndromes come straight off the set bit positions. Buffer
        // index j carries the coefficient of degree n - 1 - j.
        for j in self.work.iter_ones() {
            let d = n1 - j;
            for (si, s) in self.syndromes.iter_mut().step_by(2).enumerate() {
                let i = 2 * si + 1;
                *s ^= self.gf.alpha_pow((i * d) % order);
            }
        }

        // Even syndromes of a binary code satisfy S_2i = S_i^2.
        for v in (2..=t2).step_by(2) {
            let h = self.syndromes[v / 2 - 1];
            self.syndromes[v - 1] = self.gf.mul(h, h);
        }

        self.syndromes.iter().any(|&s| s != 0)
    }

    /// Berlekamp-Massey over the 2t syndromes; returns the locator degree.
    fn berlekamp_massey(&mut self) -> usize {
        let t2 = 2 * self.code.t;
        self.sigma.fill(0);
        self.sigma[0] = 1;
        self.prev.fill(0);
        self.prev[0] = 1;

        let mut l = 0usize;
        // Last nonzero discrepancy and the x power accumulated since the
        // register length last changed.
        let mut b: u16 = 1;
        let mut shift = 1usize;

        for step in 0..t2 {
            let mut d = self.syndromes[step];
            for i in 1..=l {
                d ^= self.gf.mul(self.sigma[i], self.syndromes[step - i]);
            }

            if d == 0 {
                shift += 1;
            } else if 2 * l <= step {
                self.scratch.copy_from_slice(&self.sigma);
                let coef = self.gf.mul(d, self.gf.inv(b));
                for i in 0..self.prev.len() - shift {
                    let upd = self.gf.mul(coef, self.prev[i]);
                    self.sigma[i + shift] ^= upd;
                }
                l = step + 1 - l;
                self.prev.copy_from_slice(&self.scratch);
                b = d;
                shift = 1;
            } else {
                let coef = self.gf.mul(d, self.gf.inv(b));
                for i in 0..self.prev.len() - shift {
                    let upd = self.gf.mul(coef, self.prev[i]);
                    self.sigma[i + shift] ^= upd;
                }
                shift += 1;
            }
        }

        l
    }

    /// Find the error positions as roots of σ over the shortened range.
    ///
    /// Returns false unless exactly `l` roots land inside the codeword. A
    /// locator whose roots fall outside the shortened positions (or that
    /// has fewer roots than its degree) cannot describe a correctable
    /// pattern.
    fn chien_search(&mut self, l: usize) -> bool {
        self.err_pos.clear();
        let order = self.gf.order();

        for degree in 0..self.code.n {
            // σ(α^(-degree)); a root marks an error at that polynomial
            // degree.
            let x = self.gf.alpha_pow(order - (degree % order));
            let mut acc = self.sigma[l];
            for i in (0..l).rev() {
                acc = self.gf.mul(acc, x) ^ self.sigma[i];
            }
            if acc == 0 {
                self.err_pos.push(self.code.n - 1 - degree);
                if self.err_pos.len() == l {
                    break;
                }
            }
        }

        self.err_pos.len() == l
    }

    /// Flip the located bits and re-check the syndromes; roll back on
    /// residue so the caller sees the uncorrected word.
    fn correct_and_verify(&mut self) -> bool {
        for i in 0..self.err_pos.len() {
            let pos = self.err_pos[i];
            let cur = self.work[pos];
            self.work.set(pos, !cur);
        }
        if self.compute_syndromes() {
            for i in 0..self.err_pos.len() {
                let pos = self.err_pos[i];
                let cur = self.work[pos];
                self.work.set(pos, !cur);
            }
            return false;
        }
        true
    }
}
