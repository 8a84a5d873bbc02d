//! BCH codec properties across the DVB-S2 parameter table

use bitvec::prelude::*;
use rand::prelude::*;
use rustydvbs2::bch::{BchCode, BchDecoder, BchEncoder, DecodeOutcome, DVBS2_CODES};

fn random_message(k: usize, rng: &mut impl Rng) -> BitVec<u8, Msb0> {
    let mut msg: BitVec<u8, Msb0> = BitVec::repeat(false, k);
    for i in 0..k {
        msg.set(i, rng.random_bool(0.5));
    }
    msg
}

/// Flip `weight` distinct random positions of `cw`.
fn inject_errors(cw: &mut BitSlice<u8, Msb0>, weight: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut positions = Vec::with_capacity(weight);
    while positions.len() < weight {
        let pos = rng.random_range(0..cw.len());
        if !positions.contains(&pos) {
            positions.push(pos);
            let cur = cw[pos];
            cw.set(pos, !cur);
        }
    }
    positions
}

#[test]
fn test_roundtrip_every_dvbs2_code() {
    rustydvbs2::tracing_init::init_test_tracing();
    let mut rng = rand::rng();
    for (n, k, t) in DVBS2_CODES {
        let code = BchCode::new(n, k, t).unwrap();
        let enc = BchEncoder::new(code).unwrap();
        let mut dec = BchDecoder::new(code).unwrap();

        let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, n);
        let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, k);

        // The zero codeword.
        let zeros: BitVec<u8, Msb0> = BitVec::repeat(false, k);
        enc.encode(&zeros, &mut cw);
        assert!(cw.not_any(), "({n}, {k}): zero message must encode to zeros");
        let outcome = dec.decode(&cw, &mut out);
        assert_eq!(outcome, DecodeOutcome { corrected: 0, ok: true });

        // A random message survives the noise-free round trip bit-exact.
        let msg = random_message(k, &mut rng);
        enc.encode(&msg, &mut cw);
        let outcome = dec.decode(&cw, &mut out);
        assert_eq!(
            outcome,
            DecodeOutcome { corrected: 0, ok: true },
            "({n}, {k}, {t})"
        );
        assert_eq!(out, msg, "({n}, {k}, {t}) round trip");
    }
}

#[test]
fn test_corrects_patterns_up_to_t() {
    let mut rng = rand::rng();
    for (n, k, t) in DVBS2_CODES {
        let code = BchCode::new(n, k, t).unwrap();
        let enc = BchEncoder::new(code).unwrap();
        let mut dec = BchDecoder::new(code).unwrap();

        let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, n);
        let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, k);

        // Short codes get more samples; the big normal-frame codes a few.
        let samples = if n < 16200 { 20 } else { 5 };
        for _ in 0..samples {
            let msg = random_message(k, &mut rng);
            enc.encode(&msg, &mut cw);
            let weight = rng.random_range(1..=t);
            inject_errors(&mut cw, weight, &mut rng);

            let outcome = dec.decode(&cw, &mut out);
            assert_eq!(
                outcome,
                DecodeOutcome {
                    corrected: weight,
                    ok: true
                },
                "({n}, {k}, {t}) weight {weight}"
            );
            assert_eq!(out, msg, "({n}, {k}, {t}) weight {weight}");
        }
    }
}

/// Full-strength sampling sweep; slow, so opt-in. Run with
/// `cargo test --release -- --ignored`.
#[test]
#[ignore]
fn test_corrects_patterns_up_to_t_exhaustive() {
    let mut rng = rand::rng();
    for (n, k, t) in DVBS2_CODES {
        let code = BchCode::new(n, k, t).unwrap();
        let enc = BchEncoder::new(code).unwrap();
        let mut dec = BchDecoder::new(code).unwrap();

        let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, n);
        let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, k);

        for _ in 0..1000 {
            let msg = random_message(k, &mut rng);
            enc.encode(&msg, &mut cw);
            let weight = rng.random_range(1..=t);
            inject_errors(&mut cw, weight, &mut rng);
            let outcome = dec.decode(&cw, &mut out);
            assert!(outcome.ok, "({n}, {k}, {t}) weight {weight}");
            assert_eq!(out, msg);
        }
    }
}

#[test]
fn test_never_silently_returns_original_beyond_t() {
    // Error patterns of weight t+1 .. 2t+1 must either fail or miscorrect
    // to a different message; returning the original as "corrected" is
    // impossible, and the detected-failure rate at t+1 must stay above 50%.
    rustydvbs2::tracing_init::init_test_tracing();
    let mut rng = rand::rng();
    let (n, k, t) = (9720, 9552, 12);
    let code = BchCode::new(n, k, t).unwrap();
    let enc = BchEncoder::new(code).unwrap();
    let mut dec = BchDecoder::new(code).unwrap();

    let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, n);
    let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, k);

    let trials = 200;
    let mut detected = 0;
    for _ in 0..trials {
        let msg = random_message(k, &mut rng);
        enc.encode(&msg, &mut cw);
        inject_errors(&mut cw, t + 1, &mut rng);

        let outcome = dec.decode(&cw, &mut out);
        if outcome.ok {
            assert_ne!(out, msg, "silent return of the original at weight t+1");
        } else {
            detected += 1;
        }
    }
    assert!(
        detected * 2 >= trials,
        "only {detected}/{trials} weight-(t+1) patterns detected"
    );

    // A few heavier patterns up to 2t+1.
    for weight in [t + 5, 2 * t, 2 * t + 1] {
        let msg = random_message(k, &mut rng);
        enc.encode(&msg, &mut cw);
        inject_errors(&mut cw, weight, &mut rng);
        let outcome = dec.decode(&cw, &mut out);
        if outcome.ok {
            assert_ne!(out, msg, "silent return of the original at weight {weight}");
        }
    }
}

#[test]
fn test_scenario_all_zeros() {
    // The all-zeros message maps to the all-zeros codeword.
    let code = BchCode::new(9720, 9552, 12).unwrap();
    let enc = BchEncoder::new(code).unwrap();
    let mut dec = BchDecoder::new(code).unwrap();

    let msg: BitVec<u8, Msb0> = BitVec::repeat(false, 9552);
    let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, 9720);
    enc.encode(&msg, &mut cw);
    assert!(cw.not_any());

    let mut out: BitVec<u8, Msb0> = BitVec::repeat(true, 9552);
    let outcome = dec.decode(&cw, &mut out);
    assert_eq!(outcome, DecodeOutcome { corrected: 0, ok: true });
    assert!(out.not_any());
}

#[test]
fn test_scenario_three_flips() {
    // Three flipped bits come back corrected.
    let code = BchCode::new(9720, 9552, 12).unwrap();
    let mut dec = BchDecoder::new(code).unwrap();

    let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, 9720);
    for pos in [0usize, 100, 500] {
        cw.set(pos, true);
    }

    let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, 9552);
    let outcome = dec.decode(&cw, &mut out);
    assert_eq!(outcome, DecodeOutcome { corrected: 3, ok: true });
    assert!(out.not_any());
}

#[test]
fn test_scenario_weight_thirteen() {
    // Thirteen errors exceed t = 12; the decoder must not pretend the
    // zero message survived.
    let code = BchCode::new(9720, 9552, 12).unwrap();
    let mut dec = BchDecoder::new(code).unwrap();

    let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, 9720);
    for pos in 0..13 {
        cw.set(pos, true);
    }

    let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, 9552);
    let outcome = dec.decode(&cw, &mut out);
    assert!(
        !outcome.ok || out.any(),
        "weight-13 pattern silently decoded to the zero message"
    );
}

#[test]
fn test_soft_adapter_roundtrip() {
    let mut rng = rand::rng();
    let code = BchCode::new(3240, 3072, 12).unwrap();
    let enc = BchEncoder::new(code).unwrap();
    let mut dec = BchDecoder::new(code).unwrap();

    let msg = random_message(3072, &mut rng);
    let mut cw: BitVec<u8, Msb0> = BitVec::repeat(false, 3240);
    enc.encode(&msg, &mut cw);

    // Noisy-magnitude LLRs with the aff3ct sign convention.
    let llr: Vec<f32> = cw
        .iter()
        .by_vals()
        .map(|b| {
            let mag = 0.5 + rng.random_range(0.0..4.0f32);
            if b {
                -mag
            } else {
                mag
            }
        })
        .collect();

    let mut out: BitVec<u8, Msb0> = BitVec::repeat(false, 3072);
    let outcome = dec.decode_soft(&llr, &mut out);
    assert_eq!(outcome, DecodeOutcome { corrected: 0, ok: true });
    assert_eq!(out, msg);
}
