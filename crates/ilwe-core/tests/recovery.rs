// crates/ilwe-core/tests/recovery.rs
// ============================================================================
// Module: Key Recovery Tests
// Description: Rotation rows, system assembly, and Cauchy-based recovery.
// ============================================================================
//! ## Overview
//! Builds synthetic attack data from a known secret and checks that assembly
//! statistics and recovered coefficients match.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::time::Duration;

use ilwe_core::KeyRecoveryData;
use ilwe_core::RecoveryError;
use ilwe_core::recover_key;
use ilwe_core::recovery::assemble_systems;
use ilwe_core::recovery::recovery_config;
use ilwe_core::recovery::rotation_row;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Builds exact attack data for `polynomials` secrets of `degree` coefficients.
fn attack_data(polynomials: usize, degree: usize, measurements: usize) -> KeyRecoveryData {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let s1: Vec<Vec<i64>> = (0 .. polynomials)
        .map(|_| (0 .. degree).map(|_| rng.gen_range(-2 ..= 2)).collect())
        .collect();
    let mut data = KeyRecoveryData {
        s1,
        y: Vec::new(),
        z: Vec::new(),
        c: Vec::new(),
        poly: Vec::new(),
        coeff: Vec::new(),
        bs: Vec::new(),
    };
    for k in 0 .. measurements {
        let challenge: Vec<i64> = (0 .. degree).map(|_| rng.gen_range(-1 ..= 1)).collect();
        let poly = k % polynomials;
        let coeff = rng.gen_range(0 .. degree);
        let row = rotation_row(&challenge, coeff);
        let z: f64 = row.iter().zip(&data.s1[poly]).map(|(a, s)| a * *s as f64).sum();
        data.y.push(i64::try_from(k % 3).unwrap());
        data.z.push(z);
        data.c.push(challenge);
        data.poly.push(poly);
        data.coeff.push(coeff);
    }
    data
}

#[test]
fn rotation_row_is_negacyclic() {
    let c = [1, 2, 3];
    assert_eq!(rotation_row(&c, 0), vec![1.0, -3.0, -2.0]);
    assert_eq!(rotation_row(&c, 1), vec![2.0, 1.0, -3.0]);
    assert_eq!(rotation_row(&c, 2), vec![3.0, 2.0, 1.0]);
}

#[test]
fn assembly_counts_positive_predictions() {
    let data = attack_data(2, 8, 12);
    let mut predictions = vec![1_u8; 12];
    predictions[0] = 0;
    predictions[5] = 0;
    let (systems, stats) = assemble_systems(&data, &predictions).unwrap();

    assert_eq!(stats.positives, 10);
    assert_eq!(stats.negatives, 2);
    assert_eq!(stats.zero_error + stats.independent_error + stats.zero_knowledge, 10);
    assert_eq!(stats.zero_knowledge, 0);
    assert_eq!(systems.len(), 2);
    assert_eq!(systems[0].rows.len() + systems[1].rows.len(), 10);
}

#[test]
fn recovery_finds_every_coefficient_from_exact_equations() {
    let data = attack_data(2, 8, 80);
    let predictions = vec![1_u8; 80];
    let report = recover_key(&data, &predictions, recovery_config(), Duration::from_secs(30)).unwrap();
    assert_eq!(report.polynomials.len(), 2);
    for polynomial in &report.polynomials {
        assert_eq!(polynomial.correct, 8, "polynomial {}", polynomial.index);
        assert_eq!(polynomial.equations, 40);
        assert!(polynomial.failure.is_none());
    }
}

#[test]
fn polynomial_without_equations_reports_failure() {
    let data = attack_data(2, 8, 10);
    let predictions: Vec<u8> = (0 .. 10).map(|k| u8::from(k % 2 == 0)).collect();
    let report = recover_key(&data, &predictions, recovery_config(), Duration::from_secs(5)).unwrap();
    assert_eq!(report.polynomials[1].equations, 0);
    assert!(report.polynomials[1].failure.is_some());
}

#[test]
fn short_inputs_are_rejected() {
    let mut data = attack_data(1, 4, 6);
    data.z.truncate(3);
    let err = assemble_systems(&data, &[1; 6]).unwrap_err();
    assert!(matches!(err, RecoveryError::LengthMismatch(_)));
}

#[test]
fn missing_bs_defaults_to_empty() {
    let json = r#"{"s1": [[1, 0]], "y": [0], "z": [1.0], "c": [[1, 0]], "poly": [0], "coeff": [0]}"#;
    let data: KeyRecoveryData = serde_json::from_str(json).unwrap();
    assert!(data.bs.is_empty());
    assert_eq!(data.shape().unwrap(), (1, 2));
}
