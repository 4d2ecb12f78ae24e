// crates/ilwe-core/src/estimators/least_squares.rs
// ============================================================================
// Module: Least Squares Estimator
// Description: Ordinary and weighted least squares via the normal equations.
// Purpose: Provide the naive L2 baseline and the IRLS inner solve.
// Dependencies: crate::{core, interfaces}, nalgebra
// ============================================================================

//! ## Overview
//! Least squares solves `A^T W A x = A^T W b` with a Cholesky factorisation
//! and falls back to an SVD pseudo-inverse when the Gram matrix is singular.
//! The unweighted fit is the L2 estimator; the weighted fit is reused by the
//! Cauchy estimator on every iteration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::core::Estimate;
use crate::core::EstimatorFailure;
use crate::core::FailureKind;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::core::Solution;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Singular value cutoff for the pseudo-inverse fallback.
const PSEUDO_INVERSE_EPS: f64 = 1e-9;

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Ordinary least squares (L2) estimator.
///
/// Exact when no equation is contaminated; any contamination biases it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresEstimator;

impl Estimator for LeastSquaresEstimator {
    fn method(&self) -> Method {
        Method::L2
    }

    fn solve(&self, system: &LinearSystem, _oracle: Option<&[i64]>) -> Estimate {
        match least_squares(system.matrix(), system.observations()) {
            Ok(values) => Estimate::Found(Solution::rounded(&values)),
            Err(failure) => Estimate::Failed(failure),
        }
    }
}

// ============================================================================
// SECTION: Solvers
// ============================================================================

/// Solves `min ||A x - b||_2`.
///
/// # Errors
///
/// Returns [`EstimatorFailure`] when the system is empty or numerically broken.
pub fn least_squares(
    matrix: &DMatrix<f64>,
    observations: &DVector<f64>,
) -> Result<DVector<f64>, EstimatorFailure> {
    if matrix.nrows() == 0 {
        return Err(EstimatorFailure::new(FailureKind::Numerical, "system has no equations"));
    }
    solve_normal_equations(matrix.tr_mul(matrix), matrix.tr_mul(observations))
}

/// Solves `min sum_i w_i (A_i x - b_i)^2`.
///
/// # Errors
///
/// Returns [`EstimatorFailure`] when dimensions disagree or the weighted
/// normal equations cannot be solved.
pub fn weighted_least_squares(
    matrix: &DMatrix<f64>,
    observations: &DVector<f64>,
    weights: &DVector<f64>,
) -> Result<DVector<f64>, EstimatorFailure> {
    if weights.len() != matrix.nrows() {
        return Err(EstimatorFailure::new(
            FailureKind::Numerical,
            format!("{} weights supplied for {} equations", weights.len(), matrix.nrows()),
        ));
    }
    if matrix.nrows() == 0 {
        return Err(EstimatorFailure::new(FailureKind::Numerical, "system has no equations"));
    }
    let mut weighted = matrix.clone();
    for (row, weight) in weights.iter().enumerate() {
        let mut view = weighted.row_mut(row);
        view *= *weight;
    }
    // (W A)^T A = A^T W A and (W A)^T b = A^T W b for diagonal W.
    solve_normal_equations(weighted.tr_mul(matrix), weighted.tr_mul(observations))
}

/// Solves the symmetric normal equations `gram x = rhs`.
fn solve_normal_equations(
    gram: DMatrix<f64>,
    rhs: DVector<f64>,
) -> Result<DVector<f64>, EstimatorFailure> {
    if let Some(factor) = gram.clone().cholesky() {
        let solution = factor.solve(&rhs);
        if solution.iter().all(|value| value.is_finite()) {
            return Ok(solution);
        }
    }
    let solution = gram
        .svd(true, true)
        .solve(&rhs, PSEUDO_INVERSE_EPS)
        .map_err(|reason| EstimatorFailure::new(FailureKind::Numerical, reason))?;
    if solution.iter().all(|value| value.is_finite()) {
        Ok(solution)
    } else {
        Err(EstimatorFailure::new(FailureKind::Numerical, "least squares produced non-finite values"))
    }
}
