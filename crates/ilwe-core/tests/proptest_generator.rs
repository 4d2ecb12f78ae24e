//! Generator property-based tests.
//!
//! ## What is covered
//! - Same tuple, same instance.
//! - Exactly `m` rows with exactly `tau` nonzero `+-1` entries each.
//! - Every observation within the clip bound and consistent with `A s + e`.
//! - Secret coefficients within `[-eta, eta]`.
// crates/ilwe-core/tests/proptest_generator.rs
// ============================================================================
// Module: Generator Property-Based Tests
// Description: Randomized checks of instance generation invariants.
// Purpose: Ensure generated instances are deterministic and well-formed.
// ============================================================================

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

use ilwe_core::InstanceParams;
use ilwe_core::generate;
use proptest::prelude::*;

/// Strategy over small but varied instance tuples.
///
/// `eta <= 1` keeps every clean observation within the default clip, so
/// replacement rows always exist.
fn small_params() -> impl Strategy<Value = InstanceParams> {
    (1_usize .. 40, 4_usize .. 24, 0_i64 .. 2, 0.0_f64 ..= 1.0, any::<u64>()).prop_flat_map(
        |(samples, dimension, eta, contamination, seed)| {
            (1_usize ..= dimension).prop_map(move |tau| InstanceParams {
                samples,
                dimension,
                eta,
                tau,
                contamination,
                seed,
            })
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generation_is_deterministic(params in small_params()) {
        let clip = params.default_clip();
        prop_assert_eq!(generate(&params, clip), generate(&params, clip));
    }

    #[test]
    fn rows_are_sparse_signed_and_counted(params in small_params()) {
        let instance = generate(&params, params.default_clip());
        let matrix = instance.system().matrix();
        prop_assert_eq!(matrix.nrows(), params.samples);
        prop_assert_eq!(matrix.ncols(), params.dimension);
        for row in matrix.row_iter() {
            let nonzero: Vec<f64> = row.iter().copied().filter(|value| *value != 0.0).collect();
            prop_assert_eq!(nonzero.len(), params.tau);
            prop_assert!(nonzero.iter().all(|value| value.abs() == 1.0));
        }
    }

    #[test]
    fn observations_respect_clip_and_model(params in small_params()) {
        let clip = params.default_clip();
        let instance = generate(&params, clip);
        let system = instance.system();
        let secret: Vec<f64> = instance.secret().iter().map(|value| *value as f64).collect();
        prop_assert!(instance.secret().iter().all(|value| value.abs() <= params.eta));
        for (row, observation) in system.observations().iter().enumerate() {
            prop_assert!(observation.abs() <= clip);
            let clean: f64 = system
                .matrix()
                .row(row)
                .iter()
                .zip(&secret)
                .map(|(coefficient, value)| coefficient * value)
                .sum();
            let error = instance.errors()[row];
            prop_assert_eq!(error, error.trunc());
            prop_assert!((clean + error - observation).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_contamination_has_no_errors(params in small_params()) {
        let params = InstanceParams { contamination: 0.0, ..params };
        let instance = generate(&params, params.default_clip());
        prop_assert_eq!(instance.error_count(), 0);
    }
}

#[test]
fn distinct_seeds_give_distinct_instances() {
    let base = InstanceParams {
        samples: 32,
        dimension: 16,
        eta: 2,
        tau: 4,
        contamination: 0.3,
        seed: 1,
    };
    let other = InstanceParams { seed: 2, ..base };
    assert_ne!(generate(&base, 4.0), generate(&other, 4.0));
}

#[test]
fn full_contamination_contaminates_most_rows() {
    let params = InstanceParams {
        samples: 200,
        dimension: 32,
        eta: 2,
        tau: 8,
        contamination: 1.0,
        seed: 7,
    };
    let instance = generate(&params, params.default_clip());
    assert!(instance.error_count() > 100, "only {} contaminated rows", instance.error_count());
}
