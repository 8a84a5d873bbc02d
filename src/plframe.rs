//! DVB-S2 physical-layer framing
//!
//! Geometry constants and known reference symbols of the PLFRAME:
//! the 26-symbol SOF, the 64-symbol PLSC codeword, the pi/2-BPSK mapping of
//! the 90-symbol PLHEADER, and the positions of the 36-symbol pilot blocks
//! that follow every 16 payload slots.

use num::complex::Complex32;

/// Start-of-frame length in symbols.
pub const SOF_LEN: usize = 26;

/// PLSC codeword length in symbols.
pub const PLSC_LEN: usize = 64;

/// PLHEADER length: SOF followed by the PLSC codeword.
pub const PLHEADER_LEN: usize = SOF_LEN + PLSC_LEN;

/// Pilot block length in symbols.
pub const PILOT_BLK_LEN: usize = 36;

/// Payload slot length in symbols.
pub const SLOT_LEN: usize = 90;

/// Payload symbols between consecutive pilot blocks (16 slots).
pub const PILOT_PERIOD: usize = 16 * SLOT_LEN;

/// Most pilot blocks any PLFRAME carries (QPSK normal FECFRAME, 360 slots).
pub const MAX_PILOT_BLKS: usize = 22;

/// The 26 SOF bits, MSB first.
pub const SOF_BITS: u32 = 0x18D2E82;

/// Hadamard generator rows of the inner (32, 6) PLSC code.
const PLSC_GEN: [u32; 6] = [
    0x5555_5555,
    0x3333_3333,
    0x0F0F_0F0F,
    0x00FF_00FF,
    0x0000_FFFF,
    0xFFFF_FFFF,
];

/// PL scrambler prefix applied to the PLSC portion of the PLHEADER.
const PLSC_SCRAMBLER: u64 = 0x719D_83C9_5342_2DFA;

const FRAC_1_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Encode a 7-bit PLS index into the scrambled 64-bit PLSC codeword.
///
/// The six high bits select Hadamard rows of the (32, 6) inner code; the
/// low bit interleaves the 32-bit word with its complement, doubling it to
/// 64 bits; the result is XORed with the fixed scrambler prefix.
pub fn plsc_codeword(plsc: u8) -> u64 {
    assert!(plsc < 128, "PLS index must be 7 bits");

    let mut inner: u32 = 0;
    for (row, g) in PLSC_GEN.iter().enumerate() {
        if plsc >> (6 - row) & 1 == 1 {
            inner ^= g;
        }
    }

    let b7 = (plsc & 1) as u64;
    let mut cw: u64 = 0;
    for i in 0..32 {
        let y = (inner >> (31 - i)) as u64 & 1;
        cw = (cw << 2) | (y << 1) | (y ^ b7);
    }

    cw ^ PLSC_SCRAMBLER
}

/// pi/2-BPSK mapping of PLHEADER bit `bit` at symbol index `idx`.
#[inline]
fn pi2_bpsk(bit: bool, idx: usize) -> Complex32 {
    let a = if bit { -FRAC_1_SQRT_2 } else { FRAC_1_SQRT_2 };
    if idx % 2 == 0 {
        Complex32::new(a, a)
    } else {
        Complex32::new(-a, a)
    }
}

/// The 26 SOF reference symbols.
pub fn sof_symbols() -> [Complex32; SOF_LEN] {
    let mut sym = [Complex32::new(0.0, 0.0); SOF_LEN];
    for (i, s) in sym.iter_mut().enumerate() {
        let bit = SOF_BITS >> (SOF_LEN - 1 - i) & 1 == 1;
        *s = pi2_bpsk(bit, i);
    }
    sym
}

/// The full 90-symbol PLHEADER reference for a given PLS index.
pub fn plheader_symbols(plsc: u8) -> [Complex32; PLHEADER_LEN] {
    let mut sym = [Complex32::new(0.0, 0.0); PLHEADER_LEN];
    sym[..SOF_LEN].copy_from_slice(&sof_symbols());
    let cw = plsc_codeword(plsc);
    for i in 0..PLSC_LEN {
        let bit = cw >> (PLSC_LEN - 1 - i) & 1 == 1;
        sym[SOF_LEN + i] = pi2_bpsk(bit, SOF_LEN + i);
    }
    sym
}

/// The unmodulated pilot symbol, (1 + j)/sqrt(2).
#[inline]
pub fn pilot_symbol() -> Complex32 {
    Complex32::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)
}

/// First symbol of pilot block `blk` (0-based), counted from frame start.
#[inline]
pub fn pilot_blk_start(blk: usize) -> usize {
    PLHEADER_LEN + (blk + 1) * PILOT_PERIOD + blk * PILOT_BLK_LEN
}
