// crates/ilwe-core/src/estimators/ilp.rs
// ============================================================================
// Module: ILP Estimator
// Description: Max-consistent-equations integer program with big-M rows.
// Purpose: Provide the exact combinatorial baseline for small systems.
// Dependencies: crate::{core, interfaces}, good_lp (microlp backend)
// ============================================================================

//! ## Overview
//! The integer program maximises the number of equations that hold exactly:
//!
//! - integer `s_j` in `[-eta, eta]`, binary `e_i`
//! - `b_i - A_i s <= K (1 - e_i)` and `b_i - A_i s >= -K (1 - e_i)`
//! - objective `max sum e_i`
//!
//! `K` defaults to `n * eta`. The time budget is handed to the solver as its
//! own time limit, so the solve runs on the caller's thread and returns when
//! the limit fires. An incumbent found before the limit is returned with
//! [`StopReason::TimeBudget`]; a limit hit without one is a `Timeout` failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use good_lp::Expression;
use good_lp::ProblemVariables;
use good_lp::ResolutionError;
use good_lp::Solution as _;
use good_lp::SolutionStatus;
use good_lp::SolverModel;
use good_lp::Variable;
use good_lp::WithTimeLimit;
use good_lp::constraint;
use good_lp::microlp;
use good_lp::variable;

use crate::core::Estimate;
use crate::core::EstimatorFailure;
use crate::core::FailureKind;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::core::Solution;
use crate::core::StopReason;
use crate::core::round_to_integers;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Integer programming estimator with a wall-clock budget.
#[derive(Debug, Clone, Copy)]
pub struct IlpEstimator {
    /// Time limit passed to the solver.
    time_budget: Duration,
    /// Big-M override; defaults to `n * eta`.
    big_m: Option<f64>,
}

impl IlpEstimator {
    /// Creates an ILP estimator with the default big-M constant.
    #[must_use]
    pub const fn new(time_budget: Duration) -> Self {
        Self {
            time_budget,
            big_m: None,
        }
    }

    /// Overrides the big-M constant.
    #[must_use]
    pub const fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    /// Returns the big-M constant used for `system`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "n * eta is a small constant.")]
    pub fn big_m_for(&self, system: &LinearSystem) -> f64 {
        self.big_m.unwrap_or(system.dimension() as f64 * system.eta() as f64)
    }
}

impl Estimator for IlpEstimator {
    fn method(&self) -> Method {
        Method::Ilp
    }

    fn solve(&self, system: &LinearSystem, _oracle: Option<&[i64]>) -> Estimate {
        let program = IntegerProgram::from_system(system, self.big_m_for(system));
        match program.solve(self.time_budget) {
            Ok((values, status)) => Estimate::Found(Solution {
                secret: round_to_integers(&values),
                iterations: None,
                stop: matches!(status, SolutionStatus::TimeLimit).then_some(StopReason::TimeBudget),
            }),
            Err(failure) => Estimate::Failed(failure),
        }
    }
}

// ============================================================================
// SECTION: Integer Program
// ============================================================================

/// Sparse copy of the system handed to the model builder.
#[derive(Debug, Clone)]
struct IntegerProgram {
    /// Sparse rows as `(column, coefficient)` pairs.
    rows: Vec<Vec<(usize, f64)>>,
    /// Observations `b`.
    observations: Vec<f64>,
    /// Secret dimension.
    dimension: usize,
    /// Secret coefficient half-width.
    eta: f64,
    /// Big-M constant.
    big_m: f64,
}

impl IntegerProgram {
    /// Copies the sparse structure of `system`.
    #[allow(clippy::cast_precision_loss, reason = "eta is a small coefficient bound.")]
    fn from_system(system: &LinearSystem, big_m: f64) -> Self {
        let matrix = system.matrix();
        let rows = (0 .. system.rows())
            .map(|row| {
                (0 .. system.dimension())
                    .filter_map(|column| {
                        let value = matrix[(row, column)];
                        (value != 0.0).then_some((column, value))
                    })
                    .collect()
            })
            .collect();
        Self {
            rows,
            observations: system.observations().iter().copied().collect(),
            dimension: system.dimension(),
            eta: system.eta() as f64,
            big_m,
        }
    }

    /// Builds and solves the program under `time_budget`, returning the
    /// real-valued secret and the solver's termination status.
    fn solve(self, time_budget: Duration) -> Result<(Vec<f64>, SolutionStatus), EstimatorFailure> {
        let mut variables = ProblemVariables::new();
        let secret: Vec<Variable> = (0 .. self.dimension)
            .map(|_| variables.add(variable().integer().min(-self.eta).max(self.eta)))
            .collect();
        let consistent: Vec<Variable> =
            (0 .. self.rows.len()).map(|_| variables.add(variable().binary())).collect();

        let objective: Expression = consistent.iter().copied().sum();
        let mut model = variables
            .maximise(objective)
            .using(microlp)
            .with_time_limit(time_budget.as_secs_f64());
        for ((row, observation), flag) in self.rows.iter().zip(&self.observations).zip(&consistent)
        {
            let fitted: Expression =
                row.iter().map(|&(column, value)| value * secret[column]).sum();
            let over = self.big_m * *flag - fitted.clone();
            let under = fitted + self.big_m * *flag;
            model = model
                .with(constraint!(over <= self.big_m - observation))
                .with(constraint!(under <= observation + self.big_m));
        }

        let solution = model.solve().map_err(|err| classify_resolution(err, time_budget))?;
        let values = secret.iter().map(|variable| solution.value(*variable)).collect();
        Ok((values, solution.status()))
    }
}

/// Maps a backend resolution error onto the failure taxonomy.
///
/// The backend reports a time limit reached before any feasible point as an
/// `Other` error whose message starts with "Time limit".
fn classify_resolution(err: ResolutionError, time_budget: Duration) -> EstimatorFailure {
    match err {
        ResolutionError::Infeasible | ResolutionError::Unbounded => {
            EstimatorFailure::new(FailureKind::Infeasible, err.to_string())
        }
        ResolutionError::Other(detail) if detail.starts_with("Time limit") => EstimatorFailure::new(
            FailureKind::Timeout,
            format!("no solution within {} ms", time_budget.as_millis()),
        ),
        other => EstimatorFailure::new(FailureKind::Solver, other.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::time::Duration;

    use good_lp::ResolutionError;

    use super::classify_resolution;
    use crate::core::FailureKind;

    #[test]
    fn time_limit_without_incumbent_is_a_timeout() {
        let failure = classify_resolution(
            ResolutionError::Other("Time limit reached before finding a feasible solution"),
            Duration::from_millis(250),
        );
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.detail, "no solution within 250 ms");
    }

    #[test]
    fn infeasible_and_backend_errors_keep_their_category() {
        let budget = Duration::from_secs(1);
        assert_eq!(
            classify_resolution(ResolutionError::Infeasible, budget).kind,
            FailureKind::Infeasible
        );
        assert_eq!(
            classify_resolution(ResolutionError::Str("bad bounds".to_string()), budget).kind,
            FailureKind::Solver
        );
    }
}
