// crates/ilwe-core/src/core/estimate.rs
// ============================================================================
// Module: Estimator Results
// Description: Tagged estimator results and failure taxonomy.
// Purpose: Replace exception-driven control flow with explicit outcomes.
// Dependencies: nalgebra, serde
// ============================================================================

//! ## Overview
//! Every estimator returns an [`Estimate`]: either a rounded secret candidate
//! or an [`EstimatorFailure`] describing why no candidate exists. Failures are
//! ordinary values; they never abort an experiment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;

use crate::core::method::Method;

// ============================================================================
// SECTION: Estimate
// ============================================================================

/// Result of one estimator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Estimate {
    /// The estimator produced a candidate secret.
    Found(Solution),
    /// The estimator produced no candidate.
    Failed(EstimatorFailure),
}

impl Estimate {
    /// Builds a failed estimate.
    #[must_use]
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failed(EstimatorFailure::new(kind, detail))
    }

    /// Returns the candidate secret when present.
    #[must_use]
    pub fn secret(&self) -> Option<&[i64]> {
        match self {
            Self::Found(solution) => Some(&solution.secret),
            Self::Failed(_) => None,
        }
    }
}

/// Candidate secret with optional iteration diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Rounded secret candidate.
    pub secret: Vec<i64>,
    /// Iterations performed by iterative estimators.
    pub iterations: Option<usize>,
    /// Stop reason reported by iterative estimators.
    pub stop: Option<StopReason>,
}

impl Solution {
    /// Builds a solution from a real-valued estimate by rounding.
    #[must_use]
    pub fn rounded(values: &DVector<f64>) -> Self {
        Self {
            secret: round_to_integers(values.as_slice()),
            iterations: None,
            stop: None,
        }
    }
}

/// Why an iterative estimator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Rounded estimate matched the known secret.
    OracleMatch,
    /// Estimate stopped moving for the required run of iterations.
    Converged,
    /// Wall-clock budget was exhausted.
    TimeBudget,
    /// Hard iteration ceiling was reached.
    IterationLimit,
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Failure category reported by an estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Solver proved the problem infeasible or unbounded.
    Infeasible,
    /// Time budget expired without an incumbent.
    Timeout,
    /// Numerical breakdown (singular system, non-finite values).
    Numerical,
    /// Solver rejected the model or reported an internal error.
    Solver,
}

impl FailureKind {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infeasible => "infeasible",
            Self::Timeout => "timeout",
            Self::Numerical => "numerical",
            Self::Solver => "solver",
        }
    }
}

/// Estimator failure with raw detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Raw solver or numerical detail.
    pub detail: String,
}

impl EstimatorFailure {
    /// Creates a new failure.
    #[must_use]
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SECTION: Trial Outcome
// ============================================================================

/// Scored result of running one estimator against one generated instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Estimation method.
    pub method: Method,
    /// Rounded estimate, absent when the estimator failed.
    pub estimate: Option<Vec<i64>>,
    /// Wall-clock time spent in the estimator.
    pub elapsed: Duration,
    /// Whether the estimate equals the secret exactly.
    pub success: bool,
    /// Number of coordinates matching the secret.
    pub matching: usize,
}

impl TrialOutcome {
    /// Scores an estimate against the known secret.
    #[must_use]
    pub fn score(method: Method, estimate: &Estimate, secret: &[i64], elapsed: Duration) -> Self {
        match estimate.secret() {
            Some(candidate) => Self {
                method,
                estimate: Some(candidate.to_vec()),
                elapsed,
                success: candidate == secret,
                matching: candidate.iter().zip(secret).filter(|(left, right)| left == right).count(),
            },
            None => Self {
                method,
                estimate: None,
                elapsed,
                success: false,
                matching: 0,
            },
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rounds each coordinate to the nearest integer (ties away from zero).
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "Estimates are bounded by eta long before they reach i64 limits."
)]
pub fn round_to_integers(values: &[f64]) -> Vec<i64> {
    values.iter().map(|value| value.round() as i64).collect()
}
