// crates/ilwe-core/src/estimators/cauchy.rs
// ============================================================================
// Module: Cauchy Estimator
// Description: Iteratively reweighted least squares with Cauchy weights.
// Purpose: Provide the robust M-estimator that scales to large systems.
// Dependencies: crate::{core, estimators::least_squares, interfaces}, nalgebra
// ============================================================================

//! ## Overview
//! The Cauchy estimator starts from uniform weights and repeatedly:
//! 1. solves the weighted least squares problem,
//! 2. recomputes residuals `r = b - A x`,
//! 3. sets `w_i = 1 / (1 + r_i^2)` and normalises the weights to sum to one.
//!
//! With `fit_intercept` the weighted fit carries an extra constant column
//! whose coefficient is discarded; residuals use the secret coefficients only.
//! The constant absorbs the mean of the contaminating errors.
//!
//! It stops when the rounded iterate equals the oracle secret (when enabled),
//! when the iterate moved less than `convergence_eps` in max-norm for
//! `convergence_min_run` consecutive iterations, when the time budget runs
//! out, or at the hard iteration ceiling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::time::Duration;
use std::time::Instant;

use nalgebra::DMatrix;
use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;

use crate::core::Estimate;
use crate::core::FailureKind;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::core::Solution;
use crate::core::StopReason;
use crate::core::round_to_integers;
use crate::estimators::least_squares::weighted_least_squares;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default max-norm movement treated as "not moving".
pub const DEFAULT_CONVERGENCE_EPS: f64 = 0.01;
/// Default number of consecutive still iterations required to stop.
pub const DEFAULT_CONVERGENCE_MIN_RUN: usize = 10;
/// Default hard iteration ceiling.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Cauchy IRLS tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CauchyConfig {
    /// Max-norm movement below which an iteration counts as still.
    pub convergence_eps: f64,
    /// Consecutive still iterations required to declare convergence.
    pub convergence_min_run: usize,
    /// Hard iteration ceiling.
    pub max_iterations: usize,
    /// Stop as soon as the rounded iterate equals the oracle secret.
    pub oracle_stop: bool,
    /// Fit a free constant term alongside the secret.
    pub fit_intercept: bool,
}

impl Default for CauchyConfig {
    fn default() -> Self {
        Self {
            convergence_eps: DEFAULT_CONVERGENCE_EPS,
            convergence_min_run: DEFAULT_CONVERGENCE_MIN_RUN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            oracle_stop: true,
            fit_intercept: true,
        }
    }
}

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Cauchy M-estimator solved by IRLS.
#[derive(Debug, Clone, Copy)]
pub struct CauchyEstimator {
    /// Tuning knobs.
    config: CauchyConfig,
    /// Wall-clock budget checked after every iteration.
    time_budget: Duration,
}

impl CauchyEstimator {
    /// Creates a Cauchy estimator.
    #[must_use]
    pub const fn new(config: CauchyConfig, time_budget: Duration) -> Self {
        Self {
            config,
            time_budget,
        }
    }

    /// Returns the tuning knobs.
    #[must_use]
    pub const fn config(&self) -> &CauchyConfig {
        &self.config
    }
}

impl Estimator for CauchyEstimator {
    fn method(&self) -> Method {
        Method::Cauchy
    }

    #[allow(clippy::cast_precision_loss, reason = "Equation counts stay far below 2^52.")]
    fn solve(&self, system: &LinearSystem, oracle: Option<&[i64]>) -> Estimate {
        let rows = system.rows();
        if rows == 0 {
            return Estimate::failed(FailureKind::Numerical, "system has no equations");
        }
        let matrix = system.matrix();
        let observations = system.observations();
        let oracle = if self.config.oracle_stop { oracle } else { None };
        let dimension = system.dimension();
        let design: Cow<'_, DMatrix<f64>> = if self.config.fit_intercept {
            Cow::Owned(matrix.clone().insert_column(dimension, 1.0))
        } else {
            Cow::Borrowed(matrix)
        };

        let started = Instant::now();
        let mut weights = DVector::from_element(rows, 1.0 / rows as f64);
        let mut previous = DVector::<f64>::zeros(dimension);
        let mut still_run = 0_usize;
        let mut iterations = 0_usize;
        let mut stop = StopReason::IterationLimit;

        while iterations < self.config.max_iterations {
            let current = match weighted_least_squares(&design, observations, &weights) {
                Ok(fitted) => fitted.rows(0, dimension).into_owned(),
                Err(failure) => return Estimate::Failed(failure),
            };
            iterations += 1;

            let residuals = observations - matrix * &current;
            weights = residuals.map(|residual| 1.0 / (1.0 + residual * residual));
            let total = weights.sum();
            weights /= total;

            let movement = (&current - &previous).amax();
            still_run = if movement < self.config.convergence_eps { still_run + 1 } else { 0 };
            previous = current;

            if oracle.is_some_and(|secret| round_to_integers(previous.as_slice()) == secret) {
                stop = StopReason::OracleMatch;
                break;
            }
            if still_run >= self.config.convergence_min_run {
                stop = StopReason::Converged;
                break;
            }
            if started.elapsed() >= self.time_budget {
                stop = StopReason::TimeBudget;
                break;
            }
        }

        if iterations == 0 {
            return Estimate::failed(FailureKind::Numerical, "iteration ceiling is zero");
        }
        Estimate::Found(Solution {
            secret: round_to_integers(previous.as_slice()),
            iterations: Some(iterations),
            stop: Some(stop),
        })
    }
}
