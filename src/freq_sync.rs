//! PLHEADER-aided carrier frequency synchronization
//!
//! Stateful estimator of the normalized carrier frequency offset (in
//! cycles/symbol) over successive PLFRAMEs.
//!
//! **Coarse stage**: the received PLHEADER is derotated by its known
//! reference symbols (SOF only, or the full header reconstructed from the
//! PLS index), which strips the modulation and leaves a complex sinusoid at
//! the offset. Lag-1 autocorrelations of that sinusoid are accumulated over
//! a window of `period` frames; at the end of the window their angles are
//! combined under the triangular L&R window and divided by 2π.
//!
//! **Fine stage**: once the coarse residue is inside the pilot-mode
//! ambiguity limit, the phase of each pilot block (and of the PLHEADER)
//! tracks the offset across the frame. Wrapped phase differences between
//! consecutive segments, scaled by their symbol spans, average into a fine
//! estimate.
//!
//! The `coarse_corrected` flag latches on the first window whose estimate
//! falls below the fine ceiling; only an external reset (a fresh instance)
//! clears it.

use std::f64::consts::PI;

use num::complex::Complex32;
use snafu::{ensure, Snafu};
use tracing::{debug, instrument};

use crate::plframe::{
    pilot_blk_start, pilot_symbol, plheader_symbols, sof_symbols, MAX_PILOT_BLKS, PILOT_BLK_LEN,
    PILOT_PERIOD, PLHEADER_LEN, SOF_LEN,
};

/// Symbols between the start of the PLHEADER and the first pilot block.
const SPAN_HDR_PILOT: usize = PILOT_PERIOD + PLHEADER_LEN;

/// Symbols between the starts of consecutive pilot blocks.
const SPAN_PILOT_PILOT: usize = PILOT_PERIOD + PILOT_BLK_LEN;

/// Lag count when the full PLHEADER reference is available.
const FULL_LAGS: usize = PLHEADER_LEN - 1;

/// Lag count when only the SOF is used.
const SOF_LAGS: usize = SOF_LEN - 1;

/// Largest offset the pilot-mode fine estimator resolves unambiguously:
/// half a cycle over the widest segment span, 1/(2 * 1530) ≈ 3.268e-4.
pub const FINE_FOFFSET_CEIL: f64 = 1.0 / (2.0 * SPAN_HDR_PILOT as f64);

#[derive(Debug, Snafu)]
pub enum FreqSyncError {
    #[snafu(display("coarse estimation period must be at least one frame"))]
    ZeroPeriod,
}

/// Carrier frequency offset estimator driven once per PLFRAME.
///
/// All buffers are sized at construction; the per-frame calls allocate
/// nothing. One instance serves one stream and is not meant to be shared.
pub struct FreqSync {
    period: usize,
    i_frame: usize,
    coarse_foffset: f64,
    fine_foffset: f64,
    coarse_corrected: bool,
    fine_est_ready: bool,
    sof_ref: [Complex32; SOF_LEN],
    plheader_ref: [Complex32; PLHEADER_LEN],
    last_plsc: Option<u8>,
    /// Lag-1 autocorrelations accumulated over the current window.
    acc: Vec<Complex32>,
    w_full: Vec<f64>,
    w_sof: Vec<f64>,
    /// Phase of the PLHEADER (index 0) and of each pilot block (1..).
    angle_pilot: [f64; MAX_PILOT_BLKS + 1],
    /// Derotated PLHEADER output buffer.
    derot: Vec<Complex32>,
}

impl FreqSync {
    /// Create an estimator that refreshes its coarse estimate every
    /// `period` frames.
    pub fn new(period: usize) -> Result<FreqSync, FreqSyncError> {
        ensure!(period >= 1, ZeroPeriodSnafu);
        Ok(FreqSync {
            period,
            i_frame: 0,
            coarse_foffset: 0.0,
            fine_foffset: 0.0,
            coarse_corrected: false,
            fine_est_ready: false,
            sof_ref: sof_symbols(),
            plheader_ref: [Complex32::new(0.0, 0.0); PLHEADER_LEN],
            last_plsc: None,
            acc: vec![Complex32::new(0.0, 0.0); FULL_LAGS],
            w_full: lr_weights(FULL_LAGS),
            w_sof: lr_weights(SOF_LAGS),
            angle_pilot: [0.0; MAX_PILOT_BLKS + 1],
            derot: vec![Complex32::new(0.0, 0.0); PLHEADER_LEN],
        })
    }

    /// Accumulate one frame of autocorrelation evidence.
    ///
    /// Returns true exactly on the `period`-th accumulation, at which point
    /// `coarse_foffset` holds the fresh estimate, the window restarts, and
    /// `coarse_corrected` latches if the estimate is inside the fine
    /// ceiling.
    ///
    /// # Arguments
    /// * `frame` - received symbols from the frame start; at least the
    ///   PLHEADER (or the SOF when `full_plheader` is false) must be there
    /// * `full_plheader` - use all 90 reference symbols instead of the SOF
    /// * `plsc` - PLS index used to rebuild the PLSC reference symbols
    #[instrument(skip(self, frame))]
    pub fn estimate_coarse(&mut self, frame: &[Complex32], full_plheader: bool, plsc: u8) -> bool {
        let lags = if full_plheader {
            self.refresh_plheader_ref(plsc);
            assert!(frame.len() >= PLHEADER_LEN, "frame shorter than the PLHEADER");
            accumulate_lag1(&mut self.acc, frame, &self.plheader_ref);
            FULL_LAGS
        } else {
            assert!(frame.len() >= SOF_LEN, "frame shorter than the SOF");
            accumulate_lag1(&mut self.acc, frame, &self.sof_ref);
            SOF_LAGS
        };

        self.i_frame += 1;
        if self.i_frame < self.period {
            return false;
        }

        let w = if lags == FULL_LAGS {
            &self.w_full
        } else {
            &self.w_sof
        };
        let mut theta = 0.0f64;
        for (weight, c) in w.iter().zip(&self.acc) {
            theta += weight * (c.im as f64).atan2(c.re as f64);
        }
        self.coarse_foffset = theta / (2.0 * PI);
        if self.coarse_foffset.abs() < FINE_FOFFSET_CEIL {
            self.coarse_corrected = true;
        }
        debug!(
            coarse_foffset = self.coarse_foffset,
            corrected = self.coarse_corrected,
            "coarse estimate"
        );

        self.acc.fill(Complex32::new(0.0, 0.0));
        self.i_frame = 0;
        true
    }

    /// Phase of the received SOF against its reference; stored as the
    /// PLHEADER phase.
    pub fn estimate_sof_phase(&mut self, symbols: &[Complex32]) -> f64 {
        assert!(symbols.len() >= SOF_LEN, "need the full SOF");
        let angle = segment_phase(&symbols[..SOF_LEN], &self.sof_ref);
        self.angle_pilot[0] = angle;
        angle
    }

    /// Phase of the full received PLHEADER against the reference rebuilt
    /// from `plsc`; stored as the PLHEADER phase.
    pub fn estimate_plheader_phase(&mut self, symbols: &[Complex32], plsc: u8) -> f64 {
        assert!(symbols.len() >= PLHEADER_LEN, "need the full PLHEADER");
        self.refresh_plheader_ref(plsc);
        let angle = segment_phase(&symbols[..PLHEADER_LEN], &self.plheader_ref);
        self.angle_pilot[0] = angle;
        angle
    }

    /// Phase of pilot block `blk`, taken from the frame-start buffer and
    /// stored at `angle_pilot[blk + 1]`.
    pub fn estimate_pilot_phase(&mut self, frame: &[Complex32], blk: usize) -> f64 {
        assert!(blk < MAX_PILOT_BLKS, "pilot block index out of range");
        let start = pilot_blk_start(blk);
        assert!(
            frame.len() >= start + PILOT_BLK_LEN,
            "frame ends before pilot block {blk}"
        );

        let p = pilot_symbol();
        let mut sum = Complex32::new(0.0, 0.0);
        for s in &frame[start..start + PILOT_BLK_LEN] {
            sum += *s * p.conj();
        }
        let angle = (sum.im as f64).atan2(sum.re as f64);
        self.angle_pilot[blk + 1] = angle;
        angle
    }

    /// Fine estimate from the phases gathered this frame.
    ///
    /// Requires the coarse-corrected regime and at least one pilot block;
    /// calling it earlier is a caller-graph bug and asserts. Each wrapped
    /// phase difference between consecutive segments is scaled by 2π times
    /// its span, and the per-segment offsets average into `fine_foffset`.
    pub fn estimate_fine_pilot_mode(&mut self, n_pilot_blks: usize) -> f64 {
        assert!(
            self.coarse_corrected,
            "fine estimation requires the coarse-corrected regime"
        );
        assert!(
            (1..=MAX_PILOT_BLKS).contains(&n_pilot_blks),
            "need between 1 and {} pilot blocks",
            MAX_PILOT_BLKS
        );

        let mut sum = 0.0f64;
        for i in 0..n_pilot_blks {
            let span = if i == 0 {
                SPAN_HDR_PILOT
            } else {
                SPAN_PILOT_PILOT
            } as f64;
            let diff = wrap_phase(self.angle_pilot[i + 1] - self.angle_pilot[i]);
            sum += diff / (2.0 * PI * span);
        }
        self.fine_foffset = sum / n_pilot_blks as f64;
        self.fine_est_ready = true;
        debug!(
            fine_foffset = self.fine_foffset,
            n_pilot_blks, "fine estimate"
        );
        self.fine_foffset
    }

    /// Rotate the received PLHEADER by the negative of its phase estimate.
    ///
    /// With `open_loop` the symbols are assumed uncorrected and each is
    /// additionally derotated by the accumulated coarse offset ramp.
    /// Returns the internal 90-symbol buffer.
    pub fn derotate_plheader(&mut self, symbols: &[Complex32], open_loop: bool) -> &[Complex32] {
        assert!(symbols.len() >= PLHEADER_LEN, "need the full PLHEADER");
        let phase = self.angle_pilot[0];
        for (k, (out, s)) in self.derot.iter_mut().zip(symbols).enumerate() {
            let mut rot = -phase;
            if open_loop {
                rot -= 2.0 * PI * self.coarse_foffset * k as f64;
            }
            *out = *s * Complex32::from_polar(1.0, rot as f32);
        }
        &self.derot
    }

    pub fn is_coarse_corrected(&self) -> bool {
        self.coarse_corrected
    }

    pub fn has_fine_foffset_est(&self) -> bool {
        self.fine_est_ready
    }

    /// Latest coarse estimate, cycles/symbol.
    pub fn coarse_foffset(&self) -> f64 {
        self.coarse_foffset
    }

    /// Latest fine estimate, cycles/symbol.
    pub fn fine_foffset(&self) -> f64 {
        self.fine_foffset
    }

    fn refresh_plheader_ref(&mut self, plsc: u8) {
        if self.last_plsc != Some(plsc) {
            self.plheader_ref = plheader_symbols(plsc);
            self.last_plsc = Some(plsc);
        }
    }
}

/// Derotate `frame` by the reference and add its lag-1 products into `acc`.
fn accumulate_lag1(acc: &mut [Complex32], frame: &[Complex32], reference: &[Complex32]) {
    let mut prev = frame[0] * reference[0].conj();
    for (k, (s, r)) in frame[1..].iter().zip(&reference[1..]).enumerate() {
        let z = *s * r.conj();
        acc[k] += z * prev.conj();
        prev = z;
    }
}

/// Phase of the modulation-stripped sum over one reference segment.
fn segment_phase(segment: &[Complex32], reference: &[Complex32]) -> f64 {
    let mut sum = Complex32::new(0.0, 0.0);
    for (s, r) in segment.iter().zip(reference) {
        sum += *s * r.conj();
    }
    (sum.im as f64).atan2(sum.re as f64)
}

/// Wrap an angle into (-π, π].
fn wrap_phase(x: f64) -> f64 {
    let mut y = x % (2.0 * PI);
    if y > PI {
        y -= 2.0 * PI;
    } else if y <= -PI {
        y += 2.0 * PI;
    }
    y
}

/// Triangular L&R window over `l` lag-1 autocorrelation angles,
/// w_k ∝ l^2 - (2k - l)^2, normalized to unit sum so the combined angle is
/// an unbiased offset estimate.
fn lr_weights(l: usize) -> Vec<f64> {
    let lf = l as f64;
    let mut w: Vec<f64> = (1..=l)
        .map(|k| {
            let kf = k as f64;
            lf * lf - (2.0 * kf - lf) * (2.0 * kf - lf)
        })
        .collect();
    let sum: f64 = w.iter().sum();
    for v in &mut w {
        *v /= sum;
    }
    w
}
