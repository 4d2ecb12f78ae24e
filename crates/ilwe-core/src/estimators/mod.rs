// crates/ilwe-core/src/estimators/mod.rs
// ============================================================================
// Module: Estimator Suite
// Description: The five CILWE estimators and their shared configuration.
// Purpose: Dispatch a method identifier to a configured estimator.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`EstimatorSuite`] owns one configured instance of each estimator. Only the
//! ILP and Cauchy estimators honour the shared time budget; the convex and
//! least-squares estimators run to solver termination.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cauchy;
pub mod convex;
pub mod ilp;
pub mod least_squares;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

pub use cauchy::CauchyConfig;
pub use cauchy::CauchyEstimator;
pub use convex::ConvexEstimator;
pub use convex::ConvexLoss;
pub use ilp::IlpEstimator;
pub use least_squares::LeastSquaresEstimator;
pub use least_squares::least_squares;
pub use least_squares::weighted_least_squares;

use crate::core::Estimate;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::interfaces::Estimator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-trial budget for the ILP and Cauchy estimators.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(120);
/// Default Huber quadratic-to-linear threshold.
pub const DEFAULT_HUBER_THRESHOLD: f64 = 0.125;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Shared estimator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuiteConfig {
    /// Per-trial wall-clock budget for ILP and Cauchy.
    pub time_budget: Duration,
    /// Huber threshold `M`.
    pub huber_threshold: f64,
    /// Cauchy IRLS knobs.
    pub cauchy: CauchyConfig,
    /// ILP big-M override.
    pub big_m: Option<f64>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            huber_threshold: DEFAULT_HUBER_THRESHOLD,
            cauchy: CauchyConfig::default(),
            big_m: None,
        }
    }
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// One configured estimator per method.
#[derive(Debug, Clone)]
pub struct EstimatorSuite {
    /// Integer program.
    ilp: IlpEstimator,
    /// Least absolute deviations.
    l1: ConvexEstimator,
    /// Ordinary least squares.
    l2: LeastSquaresEstimator,
    /// Huber regression.
    huber: ConvexEstimator,
    /// Cauchy IRLS.
    cauchy: CauchyEstimator,
}

impl EstimatorSuite {
    /// Builds the suite from a configuration.
    #[must_use]
    pub fn new(config: &SuiteConfig) -> Self {
        let ilp = match config.big_m {
            Some(big_m) => IlpEstimator::new(config.time_budget).with_big_m(big_m),
            None => IlpEstimator::new(config.time_budget),
        };
        Self {
            ilp,
            l1: ConvexEstimator::l1(),
            l2: LeastSquaresEstimator,
            huber: ConvexEstimator::huber(config.huber_threshold),
            cauchy: CauchyEstimator::new(config.cauchy, config.time_budget),
        }
    }

    /// Returns the estimator implementing `method`.
    #[must_use]
    pub fn estimator(&self, method: Method) -> &dyn Estimator {
        match method {
            Method::Ilp => &self.ilp,
            Method::L1 => &self.l1,
            Method::L2 => &self.l2,
            Method::Huber => &self.huber,
            Method::Cauchy => &self.cauchy,
        }
    }

    /// Runs `method` on `system`.
    #[must_use]
    pub fn solve(&self, method: Method, system: &LinearSystem, oracle: Option<&[i64]>) -> Estimate {
        self.estimator(method).solve(system, oracle)
    }
}

impl Default for EstimatorSuite {
    fn default() -> Self {
        Self::new(&SuiteConfig::default())
    }
}
