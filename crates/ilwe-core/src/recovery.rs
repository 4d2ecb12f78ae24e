// crates/ilwe-core/src/recovery.rs
// ============================================================================
// Module: Key Recovery
// Description: Per-polynomial CILWE systems from side-channel attack data.
// Purpose: Recover ML-DSA secret polynomials with the Cauchy estimator.
// Dependencies: crate::{core, estimators, interfaces}, nalgebra, serde, thiserror
// ============================================================================

//! ## Overview
//! Attack data pairs each measured signature coefficient `z[k]` with the
//! challenge polynomial `c[k]`, the secret polynomial index `poly[k]` and the
//! coefficient index `coeff[k]`. Every measurement the classifier marks as
//! positive contributes the equation
//! `rot(c[k])[coeff[k]] . s1[poly[k]] = z[k]` to its polynomial's system,
//! where `rot` is the negacyclic rotation matrix. Each system is then solved
//! with the Cauchy estimator, using the known `s1` only to stop early and to
//! count correct coefficients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use nalgebra::DMatrix;
use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Estimate;
use crate::core::LinearSystem;
use crate::core::StopReason;
use crate::estimators::CauchyConfig;
use crate::estimators::CauchyEstimator;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Iteration ceiling used for key recovery.
pub const RECOVERY_MAX_ITERATIONS: usize = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key recovery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// Input arrays disagree in length.
    #[error("recovery input length mismatch: {0}")]
    LengthMismatch(String),
    /// An index refers outside the secret.
    #[error("recovery index out of range: {0}")]
    IndexOutOfRange(String),
    /// Secret polynomials are missing or ragged.
    #[error("recovery input invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Input
// ============================================================================

/// Side-channel attack data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecoveryData {
    /// Secret polynomials `s1` (`L x N`), used as ground truth.
    pub s1: Vec<Vec<i64>>,
    /// Per-measurement `y` coefficient.
    pub y: Vec<i64>,
    /// Per-measurement signature coefficient `z`.
    pub z: Vec<f64>,
    /// Per-measurement challenge polynomial `c` (length `N`).
    pub c: Vec<Vec<i64>>,
    /// Per-measurement secret polynomial index.
    pub poly: Vec<usize>,
    /// Per-measurement coefficient index.
    pub coeff: Vec<usize>,
    /// Optional per-measurement auxiliary labels.
    #[serde(default)]
    pub bs: Vec<i64>,
}

impl KeyRecoveryData {
    /// Returns `(L, N)`.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::Invalid`] when `s1` is empty or ragged.
    pub fn shape(&self) -> Result<(usize, usize), RecoveryError> {
        let Some(first) = self.s1.first() else {
            return Err(RecoveryError::Invalid("s1 has no polynomials".to_string()));
        };
        let degree = first.len();
        if degree == 0 || self.s1.iter().any(|poly| poly.len() != degree) {
            return Err(RecoveryError::Invalid("s1 polynomials must share a nonzero length".to_string()));
        }
        Ok((self.s1.len(), degree))
    }
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Returns row `row` of the negacyclic rotation matrix of `c`.
///
/// `T[i][j] = c[i - j]` for `j <= i` and `-c[N + i - j]` for `j > i`.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Challenge coefficients are tiny.")]
pub fn rotation_row(c: &[i64], row: usize) -> Vec<f64> {
    let degree = c.len();
    (0 .. degree)
        .map(|column| {
            if column <= row {
                c[row - column] as f64
            } else {
                -(c[degree + row - column] as f64)
            }
        })
        .collect()
}

/// Classification statistics of the assembled systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryStatistics {
    /// Secret polynomial count `L`.
    pub polynomials: usize,
    /// Polynomial degree `N`.
    pub degree: usize,
    /// Measurements classified positive (`y >= 0`).
    pub positives: usize,
    /// Positives with `y = 0`.
    pub zero_error: usize,
    /// Positives with `y > 0`.
    pub independent_error: usize,
    /// Positives with `y < 0` (misclassified).
    pub zero_knowledge: usize,
    /// Measurements classified negative.
    pub negatives: usize,
}

/// Equations collected for one secret polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialSystem {
    /// Secret polynomial index.
    pub index: usize,
    /// Equation rows.
    pub rows: Vec<Vec<f64>>,
    /// Observations.
    pub observations: Vec<f64>,
}

/// Builds one system per secret polynomial from positive predictions.
///
/// # Errors
///
/// Returns [`RecoveryError`] when input arrays disagree or an index is out
/// of range.
pub fn assemble_systems(
    data: &KeyRecoveryData,
    predictions: &[u8],
) -> Result<(Vec<PolynomialSystem>, RecoveryStatistics), RecoveryError> {
    let (polynomials, degree) = data.shape()?;
    let measurements = predictions.len();
    for (name, len) in [
        ("y", data.y.len()),
        ("z", data.z.len()),
        ("c", data.c.len()),
        ("poly", data.poly.len()),
        ("coeff", data.coeff.len()),
    ] {
        if len < measurements {
            return Err(RecoveryError::LengthMismatch(format!(
                "{name} has {len} entries for {measurements} predictions"
            )));
        }
    }

    let mut systems: Vec<PolynomialSystem> = (0 .. polynomials)
        .map(|index| PolynomialSystem {
            index,
            rows: Vec::new(),
            observations: Vec::new(),
        })
        .collect();
    let mut stats = RecoveryStatistics {
        polynomials,
        degree,
        ..RecoveryStatistics::default()
    };

    for (k, prediction) in predictions.iter().enumerate() {
        if *prediction != 1 {
            continue;
        }
        let poly = data.poly[k];
        let coeff = data.coeff[k];
        let challenge = &data.c[k];
        if poly >= polynomials || coeff >= degree {
            return Err(RecoveryError::IndexOutOfRange(format!(
                "measurement {k} targets polynomial {poly} coefficient {coeff}"
            )));
        }
        if challenge.len() != degree {
            return Err(RecoveryError::LengthMismatch(format!(
                "challenge {k} has {} coefficients, expected {degree}",
                challenge.len()
            )));
        }
        systems[poly].rows.push(rotation_row(challenge, coeff));
        systems[poly].observations.push(data.z[k]);
        stats.positives += 1;
        match data.y[k] {
            0 => stats.zero_error += 1,
            y if y < 0 => stats.zero_knowledge += 1,
            _ => stats.independent_error += 1,
        }
    }
    stats.negatives = measurements - stats.positives;
    Ok((systems, stats))
}

// ============================================================================
// SECTION: Recovery
// ============================================================================

/// Recovery result for one secret polynomial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolynomialRecovery {
    /// Secret polynomial index.
    pub index: usize,
    /// Equations available.
    pub equations: usize,
    /// Coefficients recovered exactly.
    pub correct: usize,
    /// Polynomial degree.
    pub degree: usize,
    /// Cauchy iterations performed.
    pub iterations: Option<usize>,
    /// Cauchy stop reason.
    pub stop: Option<StopReason>,
    /// Failure detail when no estimate was produced.
    pub failure: Option<String>,
}

/// Full key recovery report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecoveryReport {
    /// Classification statistics.
    pub statistics: RecoveryStatistics,
    /// Per-polynomial results in index order.
    pub polynomials: Vec<PolynomialRecovery>,
}

/// Returns the Cauchy configuration used for key recovery.
#[must_use]
pub fn recovery_config() -> CauchyConfig {
    CauchyConfig {
        max_iterations: RECOVERY_MAX_ITERATIONS,
        oracle_stop: true,
        ..CauchyConfig::default()
    }
}

/// Recovers every secret polynomial.
///
/// # Errors
///
/// Returns [`RecoveryError`] when the input cannot be assembled.
pub fn recover_key(
    data: &KeyRecoveryData,
    predictions: &[u8],
    config: CauchyConfig,
    time_budget: Duration,
) -> Result<KeyRecoveryReport, RecoveryError> {
    let (systems, statistics) = assemble_systems(data, predictions)?;
    let estimator = CauchyEstimator::new(config, time_budget);
    let eta = data.s1.iter().flatten().map(|value| value.abs()).max().unwrap_or(0);

    let polynomials = systems
        .iter()
        .map(|system| {
            let secret = &data.s1[system.index];
            let mut result = PolynomialRecovery {
                index: system.index,
                equations: system.rows.len(),
                correct: 0,
                degree: statistics.degree,
                iterations: None,
                stop: None,
                failure: None,
            };
            let linear = to_linear_system(system, statistics.degree, eta);
            match estimator.solve(&linear, Some(secret)) {
                Estimate::Found(solution) => {
                    result.correct =
                        solution.secret.iter().zip(secret).filter(|(left, right)| left == right).count();
                    result.iterations = solution.iterations;
                    result.stop = solution.stop;
                }
                Estimate::Failed(failure) => result.failure = Some(failure.detail),
            }
            result
        })
        .collect();

    Ok(KeyRecoveryReport {
        statistics,
        polynomials,
    })
}

/// Converts collected equations into a dense linear system.
fn to_linear_system(system: &PolynomialSystem, degree: usize, eta: i64) -> LinearSystem {
    let matrix = DMatrix::from_fn(system.rows.len(), degree, |row, column| system.rows[row][column]);
    let observations = DVector::from_column_slice(&system.observations);
    LinearSystem::assemble(matrix, observations, eta)
}
