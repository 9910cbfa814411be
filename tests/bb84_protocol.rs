//! End-to-end properties of the BB84 engine.

use proptest::prelude::*;
use qkd_sim::errors::ProtocolError;
use qkd_sim::{Basis, Bb84Config, Bit, RunRecord, SlotChoices, run};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn seeded(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

fn bit(v: u8) -> Bit {
    if v == 0 { Bit::Zero } else { Bit::One }
}

fn assert_structural_invariants(record: &RunRecord) {
    let n = record.key_length();
    assert_eq!(record.alice_bits().len(), n);
    assert_eq!(record.alice_bases().len(), n);
    assert_eq!(record.bob_bases().len(), n);
    assert_eq!(record.bob_outcomes().len(), n);

    let alice_bases = record.alice_bases();
    let bob_bases = record.bob_bases();
    let expected: Vec<usize> = (0..n).filter(|&i| alice_bases[i] == bob_bases[i]).collect();
    let sifted: Vec<usize> = record.sifted_key().iter().map(|e| e.index).collect();
    assert_eq!(sifted, expected);

    assert!(record.final_len() <= record.sifted_len());
    assert!(record.sifted_len() <= n);
    assert_eq!(
        record.final_key().is_empty(),
        !record.sifted_key().iter().any(|e| e.agrees())
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted scenario
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn scripted_eight_slot_exchange() {
    use Basis::{Diagonal as X, Rectilinear as Z};

    let alice_bits = [0, 1, 1, 0, 0, 1, 0, 1].map(bit);
    let alice_bases = [Z, X, Z, Z, X, X, Z, X];
    let bob_bases = [Z, X, X, Z, X, Z, Z, X];

    let choices: Vec<SlotChoices> = (0..8)
        .map(|i| SlotChoices {
            alice_bit: alice_bits[i],
            alice_basis: alice_bases[i],
            eve_basis: None,
            bob_basis: bob_bases[i],
        })
        .collect();

    let record = Bb84Config::new(8)
        .run_scripted(&choices, &mut seeded(2024))
        .unwrap();

    let sifted: Vec<usize> = record.sifted_key().iter().map(|e| e.index).collect();
    assert_eq!(sifted, vec![0, 1, 3, 4, 6, 7]);

    for entry in record.sifted_key() {
        assert_eq!(entry.bob_outcome, alice_bits[entry.index]);
    }

    assert_eq!(record.final_key_string(), "010001");
    assert_eq!(record.qber(), 0.0);
    assert_structural_invariants(&record);
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn honest_line_agrees_on_every_sifted_bit() {
    for seed in 0..10 {
        let record = run(500, false, &mut seeded(seed)).unwrap();
        assert!(record.sifted_key().iter().all(|e| e.agrees()));
        assert_eq!(record.qber(), 0.0);
        assert_structural_invariants(&record);
    }
}

#[test]
fn eavesdropper_converges_to_quarter_error_rate() {
    let record = run(8000, true, &mut seeded(77)).unwrap();
    let qber = record.qber();
    assert!((qber - 0.25).abs() <= 0.03, "qber {qber}");
    assert_structural_invariants(&record);
}

#[test]
fn thousand_slots_with_eve_land_in_band() {
    let record = run(1000, true, &mut seeded(1000)).unwrap();
    let qber = record.qber();
    assert!((0.20..=0.30).contains(&qber), "qber {qber}");
}

#[test]
fn eve_never_errs_where_her_basis_matches_alice() {
    let record = run(2000, true, &mut seeded(5)).unwrap();
    for entry in record.sifted_key() {
        let slot = &record.slots()[entry.index];
        let eve = slot.eve.expect("eve present on every slot");
        if eve.basis == slot.alice_basis {
            assert!(entry.agrees(), "slot {}", entry.index);
            assert_eq!(eve.outcome, slot.alice_bit);
        }
    }
}

#[test]
fn wrong_basis_interceptions_halve_agreement() {
    let record = run(6000, true, &mut seeded(8)).unwrap();
    let (mut exposed, mut errors) = (0usize, 0usize);
    for entry in record.sifted_key() {
        let slot = &record.slots()[entry.index];
        if slot.eve.map(|e| e.basis) != Some(slot.alice_basis) {
            exposed += 1;
            if !entry.agrees() {
                errors += 1;
            }
        }
    }
    let rate = errors as f64 / exposed as f64;
    assert!((rate - 0.5).abs() < 0.05, "rate {rate} over {exposed}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Reproducibility and configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn same_seed_same_record() {
    for eve in [false, true] {
        let a = run(256, eve, &mut seeded(31337)).unwrap();
        let b = run(256, eve, &mut seeded(31337)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}

#[test]
fn different_seeds_diverge() {
    let a = run(256, false, &mut seeded(1)).unwrap();
    let b = run(256, false, &mut seeded(2)).unwrap();
    assert_ne!(a.alice_bits(), b.alice_bits());
}

#[test]
fn zero_length_is_a_configuration_error() {
    let err = run(0, true, &mut seeded(0)).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("key_length"));
}

#[test]
fn scripted_run_rejects_wrong_slot_count() {
    let choices: Vec<SlotChoices> = (0..8)
        .map(|_| SlotChoices {
            alice_bit: Bit::Zero,
            alice_basis: Basis::Rectilinear,
            eve_basis: None,
            bob_basis: Basis::Rectilinear,
        })
        .collect();
    let err = Bb84Config::new(1)
        .run_scripted(&choices, &mut seeded(0))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidConfiguration(_)));
}

#[test]
fn record_serializes_for_presentation() {
    let record = run(4, true, &mut seeded(9)).unwrap();
    let value: serde_json::Value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["eve_present"], true);
    assert_eq!(value["slots"].as_array().map(Vec::len), Some(4));
    assert!(value["qber"].is_number());

    assert_eq!(value["key_length"], 4);
    assert_eq!(value["sifted_len"], record.sifted_len());
    assert_eq!(value["final_len"], record.final_len());
    assert_eq!(value["error_count"], record.error_count());
    assert_eq!(value["final_key_string"], record.final_key_string());

    let first = &value["slots"][0];
    let slot = &record.slots()[0];
    assert_eq!(first["alice_bit"], slot.alice_bit.index());
    assert_eq!(first["alice_basis"], slot.alice_basis.symbol());
    assert!(first["sent_amplitudes"].is_array());
    let final_bits: Vec<u64> = value["final_key"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b.as_u64())
        .collect();
    assert_eq!(final_bits.len(), record.final_len());
    assert!(final_bits.iter().all(|&b| b <= 1));
}

proptest! {
    #[test]
    fn prop_invariants_hold(seed in any::<u64>(), n in 1usize..200, eve in any::<bool>()) {
        let record = run(n, eve, &mut seeded(seed)).unwrap();
        prop_assert_eq!(record.key_length(), n);
        prop_assert_eq!(record.eve_bases().is_some(), eve);
        assert_structural_invariants(&record);
        if !eve {
            prop_assert_eq!(record.error_count(), 0);
        }
    }

    #[test]
    fn prop_reproducible(seed in any::<u64>(), n in 1usize..100, eve in any::<bool>()) {
        let a = run(n, eve, &mut seeded(seed)).unwrap();
        let b = run(n, eve, &mut seeded(seed)).unwrap();
        prop_assert_eq!(a, b);
    }
}
