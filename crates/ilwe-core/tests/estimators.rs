// crates/ilwe-core/tests/estimators.rs
// ============================================================================
// Module: Estimator Tests
// Description: Recovery behaviour of the five estimators on small instances.
// Purpose: Ensure every estimator recovers clean instances and fails as values.
// ============================================================================
//! ## Overview
//! Exercises exact recovery on uncontaminated instances, Cauchy stop reasons,
//! and the statistical monotonicity of success in the number of equations.

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

use ilwe_core::CauchyConfig;
use ilwe_core::Estimate;
use ilwe_core::EstimatorSuite;
use ilwe_core::FailureKind;
use ilwe_core::InstanceParams;
use ilwe_core::LinearSystem;
use ilwe_core::Method;
use ilwe_core::ProblemInstance;
use ilwe_core::StopReason;
use ilwe_core::SuiteConfig;
use ilwe_core::estimators::CauchyEstimator;
use ilwe_core::estimators::ConvexEstimator;
use ilwe_core::estimators::IlpEstimator;
use ilwe_core::estimators::LeastSquaresEstimator;
use ilwe_core::generate;
use ilwe_core::interfaces::Estimator;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// Generates a small instance.
fn instance(samples: usize, dimension: usize, tau: usize, contamination: f64, seed: u64) -> ProblemInstance {
    let params = InstanceParams {
        samples,
        dimension,
        eta: 1,
        tau,
        contamination,
        seed,
    };
    generate(&params, params.default_clip())
}

/// Returns true when the estimate equals the secret.
fn recovers(estimator: &dyn Estimator, instance: &ProblemInstance, oracle: bool) -> bool {
    let oracle = oracle.then_some(instance.secret());
    estimator.solve(instance.system(), oracle).secret() == Some(instance.secret())
}

#[test]
fn least_squares_recovers_uncontaminated_instances() {
    for seed in 0 .. 5 {
        let instance = instance(64, 16, 4, 0.0, seed);
        assert!(recovers(&LeastSquaresEstimator, &instance, false), "seed {seed}");
    }
}

#[test]
fn l1_recovers_uncontaminated_instances() {
    for seed in 0 .. 3 {
        let instance = instance(48, 16, 4, 0.0, seed);
        assert!(recovers(&ConvexEstimator::l1(), &instance, false), "seed {seed}");
    }
}

#[test]
fn huber_recovers_uncontaminated_instances() {
    for seed in 0 .. 3 {
        let instance = instance(48, 16, 4, 0.0, seed);
        assert!(recovers(&ConvexEstimator::huber(0.125), &instance, false), "seed {seed}");
    }
}

#[test]
fn ilp_recovers_uncontaminated_instances() {
    let estimator = IlpEstimator::new(Duration::from_secs(60));
    for seed in 0 .. 2 {
        let instance = instance(32, 8, 3, 0.0, seed);
        assert!(recovers(&estimator, &instance, false), "seed {seed}");
    }
}

#[test]
fn ilp_default_big_m_is_dimension_times_eta() {
    let instance = instance(4, 8, 3, 0.0, 0);
    assert_eq!(IlpEstimator::new(Duration::from_secs(1)).big_m_for(instance.system()), 8.0);
    let overridden = IlpEstimator::new(Duration::from_secs(1)).with_big_m(3.0);
    assert_eq!(overridden.big_m_for(instance.system()), 3.0);
}

#[test]
fn cauchy_stops_on_oracle_match_after_first_iteration() {
    let instance = instance(64, 16, 4, 0.0, 3);
    let estimator = CauchyEstimator::new(CauchyConfig::default(), Duration::from_secs(60));
    let Estimate::Found(solution) = estimator.solve(instance.system(), Some(instance.secret()))
    else {
        panic!("cauchy failed");
    };
    assert_eq!(solution.secret, instance.secret());
    assert_eq!(solution.stop, Some(StopReason::OracleMatch));
    assert_eq!(solution.iterations, Some(1));
}

#[test]
fn cauchy_without_oracle_stops_on_convergence() {
    let instance = instance(64, 16, 4, 0.0, 3);
    let config = CauchyConfig {
        oracle_stop: false,
        ..CauchyConfig::default()
    };
    let estimator = CauchyEstimator::new(config, Duration::from_secs(60));
    let Estimate::Found(solution) = estimator.solve(instance.system(), Some(instance.secret()))
    else {
        panic!("cauchy failed");
    };
    assert_eq!(solution.secret, instance.secret());
    assert_eq!(solution.stop, Some(StopReason::Converged));
    assert!(solution.iterations.unwrap() >= config.convergence_min_run);
}

#[test]
fn cauchy_respects_iteration_ceiling() {
    let instance = instance(64, 16, 4, 0.2, 5);
    let config = CauchyConfig {
        max_iterations: 3,
        oracle_stop: false,
        ..CauchyConfig::default()
    };
    let estimator = CauchyEstimator::new(config, Duration::from_secs(60));
    let Estimate::Found(solution) = estimator.solve(instance.system(), None) else {
        panic!("cauchy failed");
    };
    assert_eq!(solution.iterations, Some(3));
    assert_eq!(solution.stop, Some(StopReason::IterationLimit));
}

#[test]
fn cauchy_returns_best_iterate_when_budget_is_spent() {
    let instance = instance(64, 16, 4, 0.2, 5);
    let estimator = CauchyEstimator::new(CauchyConfig::default(), Duration::ZERO);
    let Estimate::Found(solution) = estimator.solve(instance.system(), None) else {
        panic!("cauchy failed");
    };
    assert_eq!(solution.iterations, Some(1));
    assert_eq!(solution.stop, Some(StopReason::TimeBudget));
    assert_eq!(solution.secret.len(), 16);
}

/// Rows whose coordinates all load positively, observed with a constant offset.
fn offset_system(offset: f64) -> (LinearSystem, Vec<i64>) {
    let secret = vec![1, -1];
    let rows = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let matrix = DMatrix::from_fn(rows.len(), 2, |row, column| rows[row][column]);
    let observations =
        DVector::from_fn(rows.len(), |row, _| rows[row][0] - rows[row][1] + offset);
    (LinearSystem::new(matrix, observations, 1).unwrap(), secret)
}

#[test]
fn cauchy_intercept_absorbs_constant_offset() {
    let (system, secret) = offset_system(1.0);
    let with_intercept = CauchyEstimator::new(
        CauchyConfig {
            oracle_stop: false,
            ..CauchyConfig::default()
        },
        Duration::from_secs(10),
    );
    assert!(with_intercept.config().fit_intercept);
    assert_eq!(with_intercept.solve(&system, None).secret(), Some(secret.as_slice()));

    let without_intercept = CauchyEstimator::new(
        CauchyConfig {
            oracle_stop: false,
            fit_intercept: false,
            ..CauchyConfig::default()
        },
        Duration::from_secs(10),
    );
    // The offset leaks into both coordinates as +2/3 and rounds away.
    assert_eq!(without_intercept.solve(&system, None).secret(), Some([2, 0].as_slice()));
}

#[test]
fn empty_system_fails_as_a_value() {
    let system = LinearSystem::new(DMatrix::zeros(0, 4), DVector::zeros(0), 1).unwrap();
    let estimate = LeastSquaresEstimator.solve(&system, None);
    let Estimate::Failed(failure) = estimate else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Numerical);

    let cauchy = CauchyEstimator::new(CauchyConfig::default(), Duration::from_secs(1));
    assert!(matches!(cauchy.solve(&system, None), Estimate::Failed(_)));
}

#[test]
fn mismatched_system_is_rejected() {
    assert!(LinearSystem::new(DMatrix::zeros(3, 4), DVector::zeros(2), 1).is_err());
    assert!(LinearSystem::new(DMatrix::zeros(2, 4), DVector::zeros(2), -1).is_err());
}

#[test]
fn suite_dispatches_every_method() {
    let suite = EstimatorSuite::new(&SuiteConfig::default());
    for method in Method::ALL {
        assert_eq!(suite.estimator(method).method(), method);
    }
}

#[test]
#[allow(clippy::cast_precision_loss, reason = "Trial counts are tiny.")]
fn success_rate_does_not_drop_with_more_equations() {
    let estimator = CauchyEstimator::new(CauchyConfig::default(), Duration::from_secs(30));
    let trials = 50_u64;
    let rate = |samples: usize| {
        let solved = (0 .. trials)
            .filter(|seed| recovers(&estimator, &instance(samples, 16, 4, 0.1, *seed), true))
            .count();
        solved as f64 / trials as f64
    };
    let small = rate(32);
    let large = rate(160);
    assert!(large + 0.1 >= small, "rate fell from {small} at m=32 to {large} at m=160");
}
