// crates/ilwe-core/src/core/instance.rs
// ============================================================================
// Module: ILWE Problem Instances
// Description: Linear systems and generated CILWE instances.
// Purpose: Hold the transient matrices estimators consume.
// Dependencies: nalgebra, thiserror
// ============================================================================

//! ## Overview
//! A [`LinearSystem`] is the `(A, b, eta)` triple every estimator consumes. A
//! [`ProblemInstance`] wraps a generated system together with its hidden error
//! vector and secret, which only the experiment harness may look at.

// ============================================================================
// SECTION: Imports
// ============================================================================

use nalgebra::DMatrix;
use nalgebra::DVector;
use thiserror::Error;

use crate::core::params::InstanceParams;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when assembling a linear system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    /// Matrix rows and observation length disagree.
    #[error("matrix has {rows} rows but {observations} observations were supplied")]
    DimensionMismatch {
        /// Number of matrix rows.
        rows: usize,
        /// Number of observations.
        observations: usize,
    },
    /// Secret bound must be non-negative.
    #[error("secret bound must be non-negative, got {0}")]
    NegativeBound(i64),
}

// ============================================================================
// SECTION: Linear System
// ============================================================================

/// Linear system `b = A s + e` with box bound `|s_j| <= eta`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    /// Coefficient matrix `A` (`m x n`).
    matrix: DMatrix<f64>,
    /// Observation vector `b` (`m`).
    observations: DVector<f64>,
    /// Secret coefficient half-width.
    eta: i64,
}

impl LinearSystem {
    /// Creates a linear system after checking dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] when `A` and `b` disagree or `eta` is negative.
    pub fn new(
        matrix: DMatrix<f64>,
        observations: DVector<f64>,
        eta: i64,
    ) -> Result<Self, SystemError> {
        if matrix.nrows() != observations.len() {
            return Err(SystemError::DimensionMismatch {
                rows: matrix.nrows(),
                observations: observations.len(),
            });
        }
        if eta < 0 {
            return Err(SystemError::NegativeBound(eta));
        }
        Ok(Self {
            matrix,
            observations,
            eta,
        })
    }

    /// Assembles a system whose dimensions are consistent by construction.
    pub(crate) const fn assemble(
        matrix: DMatrix<f64>,
        observations: DVector<f64>,
        eta: i64,
    ) -> Self {
        Self {
            matrix,
            observations,
            eta,
        }
    }

    /// Returns the coefficient matrix.
    #[must_use]
    pub const fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Returns the observation vector.
    #[must_use]
    pub const fn observations(&self) -> &DVector<f64> {
        &self.observations
    }

    /// Returns the secret coefficient half-width.
    #[must_use]
    pub const fn eta(&self) -> i64 {
        self.eta
    }

    /// Returns the number of equations.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Returns the secret dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }
}

// ============================================================================
// SECTION: Problem Instance
// ============================================================================

/// Generated CILWE instance with its hidden ground truth.
///
/// # Invariants
/// - `system.rows() == params.samples` and `secret.len() == params.dimension`.
/// - Every entry of `system.observations()` is bounded by `clip`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemInstance {
    /// Identifying tuple.
    params: InstanceParams,
    /// Observation bound used during generation.
    clip: f64,
    /// Public system handed to estimators.
    system: LinearSystem,
    /// Hidden error vector.
    errors: DVector<f64>,
    /// Hidden secret.
    secret: Vec<i64>,
}

impl ProblemInstance {
    /// Assembles an instance from generator output.
    pub(crate) const fn from_parts(
        params: InstanceParams,
        clip: f64,
        system: LinearSystem,
        errors: DVector<f64>,
        secret: Vec<i64>,
    ) -> Self {
        Self {
            params,
            clip,
            system,
            errors,
            secret,
        }
    }

    /// Returns the identifying tuple.
    #[must_use]
    pub const fn params(&self) -> &InstanceParams {
        &self.params
    }

    /// Returns the observation bound used during generation.
    #[must_use]
    pub const fn clip(&self) -> f64 {
        self.clip
    }

    /// Returns the public linear system.
    #[must_use]
    pub const fn system(&self) -> &LinearSystem {
        &self.system
    }

    /// Returns the hidden error vector.
    #[must_use]
    pub const fn errors(&self) -> &DVector<f64> {
        &self.errors
    }

    /// Returns the hidden secret.
    #[must_use]
    pub fn secret(&self) -> &[i64] {
        &self.secret
    }

    /// Returns the number of contaminated equations.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|value| **value != 0.0).count()
    }
}
