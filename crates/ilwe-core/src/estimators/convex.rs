// crates/ilwe-core/src/estimators/convex.rs
// ============================================================================
// Module: Convex Regression Estimators
// Description: L1 and Huber regression with box constraints.
// Purpose: Solve robust regression as conic programs through Clarabel.
// Dependencies: crate::{core, interfaces}, clarabel, nalgebra
// ============================================================================

//! ## Overview
//! Both losses are posed over the variable layout `[s | u | a | c]` where
//! `s` is the secret, `u` the quadratic part of the Huber residual (Huber
//! only), and `a, c >= 0` split the linear part of the residual:
//!
//! - equality rows: `A_i s + u_i + a_i - c_i = b_i`
//! - box rows: `-eta <= s_j <= eta`
//! - L1 objective: `sum (a_i + c_i)`
//! - Huber objective: `sum u_i^2 + 2 M (a_i + c_i)`
//!
//! The Huber program is the standard epigraph form: minimising over `u`
//! yields `u_i^2` for `|r_i| <= M` and `2 M |r_i| - M^2` beyond it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clarabel::algebra::CscMatrix;
use clarabel::solver::DefaultSettingsBuilder;
use clarabel::solver::DefaultSolver;
use clarabel::solver::IPSolver;
use clarabel::solver::NonnegativeConeT;
use clarabel::solver::SolverStatus;
use clarabel::solver::SupportedConeT;
use clarabel::solver::ZeroConeT;
use nalgebra::DVector;

use crate::core::Estimate;
use crate::core::EstimatorFailure;
use crate::core::FailureKind;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::core::Solution;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Loss
// ============================================================================

/// Robust regression loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvexLoss {
    /// Least absolute deviations.
    L1,
    /// Huber loss with the given quadratic-to-linear threshold.
    Huber {
        /// Residual magnitude where the loss turns linear.
        threshold: f64,
    },
}

impl ConvexLoss {
    /// Returns the linear cost on each residual half.
    fn linear_weight(self) -> f64 {
        match self {
            Self::L1 => 1.0,
            Self::Huber {
                threshold,
            } => 2.0 * threshold,
        }
    }

    /// Returns true when the program carries the quadratic residual block.
    const fn is_quadratic(self) -> bool {
        matches!(self, Self::Huber { .. })
    }
}

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Box-constrained L1 or Huber regression estimator.
#[derive(Debug, Clone, Copy)]
pub struct ConvexEstimator {
    /// Loss minimised by this estimator.
    loss: ConvexLoss,
}

impl ConvexEstimator {
    /// Creates an L1 estimator.
    #[must_use]
    pub const fn l1() -> Self {
        Self {
            loss: ConvexLoss::L1,
        }
    }

    /// Creates a Huber estimator.
    #[must_use]
    pub const fn huber(threshold: f64) -> Self {
        Self {
            loss: ConvexLoss::Huber {
                threshold,
            },
        }
    }

    /// Returns the configured loss.
    #[must_use]
    pub const fn loss(&self) -> ConvexLoss {
        self.loss
    }

    /// Solves the conic program and returns the real-valued secret estimate.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorFailure`] when Clarabel rejects the data or stops
    /// without a usable solution.
    pub fn minimise(&self, system: &LinearSystem) -> Result<DVector<f64>, EstimatorFailure> {
        let layout = Layout::new(system, self.loss.is_quadratic());
        let program = layout.program(system, self.loss);

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|err| EstimatorFailure::new(FailureKind::Solver, err.to_string()))?;
        program.check_dimensions()?;
        let mut solver = DefaultSolver::new(
            &program.quadratic,
            &program.linear,
            &program.constraints,
            &program.bounds,
            &program.cones,
            settings,
        );
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(DVector::from_column_slice(&solver.solution.x[.. layout.dimension]))
            }
            SolverStatus::PrimalInfeasible
            | SolverStatus::DualInfeasible
            | SolverStatus::AlmostPrimalInfeasible
            | SolverStatus::AlmostDualInfeasible => {
                Err(EstimatorFailure::new(FailureKind::Infeasible, "conic program is infeasible"))
            }
            SolverStatus::MaxTime => {
                Err(EstimatorFailure::new(FailureKind::Timeout, "solver time limit reached"))
            }
            SolverStatus::MaxIterations => {
                Err(EstimatorFailure::new(FailureKind::Solver, "solver iteration limit reached"))
            }
            SolverStatus::NumericalError => {
                Err(EstimatorFailure::new(FailureKind::Numerical, "solver numerical error"))
            }
            _ => Err(EstimatorFailure::new(
                FailureKind::Solver,
                "solver stopped without a solution",
            )),
        }
    }
}

impl Estimator for ConvexEstimator {
    fn method(&self) -> Method {
        match self.loss {
            ConvexLoss::L1 => Method::L1,
            ConvexLoss::Huber {
                ..
            } => Method::Huber,
        }
    }

    fn solve(&self, system: &LinearSystem, _oracle: Option<&[i64]>) -> Estimate {
        match self.minimise(system) {
            Ok(values) => Estimate::Found(Solution::rounded(&values)),
            Err(failure) => Estimate::Failed(failure),
        }
    }
}

// ============================================================================
// SECTION: Program Assembly
// ============================================================================

/// Column offsets of the stacked variable vector.
#[derive(Debug, Clone, Copy)]
struct Layout {
    /// Number of equations.
    rows: usize,
    /// Secret dimension; `s` occupies `0 .. dimension`.
    dimension: usize,
    /// First column of `u`, when present.
    quadratic: Option<usize>,
    /// First column of `a`.
    positive: usize,
    /// First column of `c`.
    negative: usize,
    /// Total number of columns.
    columns: usize,
}

/// Clarabel problem data.
struct ConicProgram {
    /// Upper-triangular quadratic cost `P`.
    quadratic: CscMatrix<f64>,
    /// Linear cost `q`.
    linear: Vec<f64>,
    /// Constraint matrix `A`.
    constraints: CscMatrix<f64>,
    /// Constraint right-hand side `b`.
    bounds: Vec<f64>,
    /// Cone partition of the constraint rows.
    cones: Vec<SupportedConeT<f64>>,
}

impl Layout {
    /// Computes offsets for a system.
    fn new(system: &LinearSystem, quadratic: bool) -> Self {
        let rows = system.rows();
        let dimension = system.dimension();
        let positive = if quadratic { dimension + rows } else { dimension };
        let negative = positive + rows;
        Self {
            rows,
            dimension,
            quadratic: quadratic.then_some(dimension),
            positive,
            negative,
            columns: negative + rows,
        }
    }

    /// Builds the conic program `min 1/2 x'Px + q'x  s.t.  Ax + s = b, s in K`.
    #[allow(clippy::cast_precision_loss, reason = "eta is a small coefficient bound.")]
    fn program(&self, system: &LinearSystem, loss: ConvexLoss) -> ConicProgram {
        let matrix = system.matrix();
        let eta = system.eta() as f64;

        let mut quadratic = Vec::new();
        if let Some(offset) = self.quadratic {
            for row in 0 .. self.rows {
                quadratic.push((offset + row, offset + row, 2.0));
            }
        }

        let mut linear = vec![0.0; self.columns];
        let weight = loss.linear_weight();
        for value in &mut linear[self.positive ..] {
            *value = weight;
        }

        let mut entries = Vec::new();
        let mut bounds = Vec::with_capacity(self.rows + 2 * self.dimension + 2 * self.rows);
        for row in 0 .. self.rows {
            for column in 0 .. self.dimension {
                let value = matrix[(row, column)];
                if value != 0.0 {
                    entries.push((row, column, value));
                }
            }
            if let Some(offset) = self.quadratic {
                entries.push((row, offset + row, 1.0));
            }
            entries.push((row, self.positive + row, 1.0));
            entries.push((row, self.negative + row, -1.0));
            bounds.push(system.observations()[row]);
        }

        // Nonnegative slack rows: b - A x >= 0.
        let mut next = self.rows;
        for column in 0 .. self.dimension {
            entries.push((next, column, 1.0));
            bounds.push(eta);
            next += 1;
        }
        for column in 0 .. self.dimension {
            entries.push((next, column, -1.0));
            bounds.push(eta);
            next += 1;
        }
        for row in 0 .. self.rows {
            entries.push((next, self.positive + row, -1.0));
            bounds.push(0.0);
            next += 1;
        }
        for row in 0 .. self.rows {
            entries.push((next, self.negative + row, -1.0));
            bounds.push(0.0);
            next += 1;
        }

        ConicProgram {
            quadratic: csc_from_triplets(self.columns, self.columns, quadratic),
            linear,
            constraints: csc_from_triplets(next, self.columns, entries),
            bounds,
            cones: vec![
                ZeroConeT(self.rows),
                NonnegativeConeT(2 * self.dimension + 2 * self.rows),
            ],
        }
    }
}

impl ConicProgram {
    /// Checks the shapes Clarabel asserts on before it is handed the data.
    fn check_dimensions(&self) -> Result<(), EstimatorFailure> {
        let columns = self.linear.len();
        let cone_rows: usize = self
            .cones
            .iter()
            .map(|cone| match cone {
                ZeroConeT(rows) | NonnegativeConeT(rows) => *rows,
                _ => 0,
            })
            .sum();
        let consistent = self.quadratic.m == columns
            && self.quadratic.n == columns
            && self.constraints.n == columns
            && self.constraints.m == self.bounds.len()
            && cone_rows == self.bounds.len();
        if consistent {
            Ok(())
        } else {
            Err(EstimatorFailure::new(
                FailureKind::Solver,
                format!(
                    "conic program shape mismatch: {columns} columns, {} constraint rows, {} \
                     bounds, {cone_rows} cone rows",
                    self.constraints.m,
                    self.bounds.len()
                ),
            ))
        }
    }
}

/// Builds a compressed sparse column matrix from `(row, column, value)` triplets.
///
/// Triplets must not repeat a position.
fn csc_from_triplets(
    rows: usize,
    columns: usize,
    mut triplets: Vec<(usize, usize, f64)>,
) -> CscMatrix<f64> {
    triplets.sort_by_key(|&(row, column, _)| (column, row));
    let mut colptr = vec![0_usize; columns + 1];
    for &(_, column, _) in &triplets {
        colptr[column + 1] += 1;
    }
    for column in 0 .. columns {
        colptr[column + 1] += colptr[column];
    }
    let rowval = triplets.iter().map(|&(row, _, _)| row).collect();
    let nzval = triplets.iter().map(|&(_, _, value)| value).collect();
    CscMatrix::new(rows, columns, colptr, rowval, nzval)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
