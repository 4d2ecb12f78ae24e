// crates/ilwe-core/src/runtime/harness.rs
// ============================================================================
// Module: Experiment Harness
// Description: Timed, scored, logged estimator trials.
// Purpose: Run estimators against generated instances and tabulate results.
// Dependencies: crate::{core, estimators, interfaces}
// ============================================================================

//! ## Overview
//! [`run_trial`] times one estimator on one instance, logs the estimator
//! event, and scores the rounded estimate against the hidden secret.
//! [`SuiteRunner`] adapts an [`EstimatorSuite`] to the driver's
//! [`TrialRunner`] seam, and [`TrialTable`] collects per-method outcomes for
//! side-by-side comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Instant;

use crate::core::Estimate;
use crate::core::EstimatorEvent;
use crate::core::Method;
use crate::core::ProblemInstance;
use crate::core::TrialOutcome;
use crate::estimators::EstimatorSuite;
use crate::interfaces::Estimator;
use crate::interfaces::ExperimentLog;
use crate::interfaces::TrialRunner;
use crate::runtime::table::render_grid;

// ============================================================================
// SECTION: Trials
// ============================================================================

/// Runs `estimator` on `instance`, logging and scoring the result.
pub fn run_trial<E, L>(estimator: &E, instance: &ProblemInstance, log: &L) -> TrialOutcome
where
    E: Estimator + ?Sized,
    L: ExperimentLog + ?Sized,
{
    let method = estimator.method();
    let started = Instant::now();
    let estimate = estimator.solve(instance.system(), Some(instance.secret()));
    let elapsed = started.elapsed();
    match &estimate {
        Estimate::Found(solution) => log.record_estimator(&EstimatorEvent::found(
            method,
            solution.iterations,
            solution.stop,
            elapsed.as_millis(),
        )),
        Estimate::Failed(failure) => log.record_estimator(&EstimatorEvent::failed(
            method,
            failure.kind,
            &failure.detail,
            elapsed.as_millis(),
        )),
    }
    TrialOutcome::score(method, &estimate, instance.secret(), elapsed)
}

/// Runs every requested method on the same instance.
pub fn compare_methods<L>(
    suite: &EstimatorSuite,
    methods: &[Method],
    instance: &ProblemInstance,
    log: &L,
) -> TrialTable
where
    L: ExperimentLog + ?Sized,
{
    let mut table = TrialTable::default();
    for method in methods {
        table.insert(run_trial(suite.estimator(*method), instance, log));
    }
    table
}

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Trial runner backed by an estimator suite and a log sink.
pub struct SuiteRunner<'a, L: ExperimentLog + ?Sized> {
    /// Configured estimators.
    suite: &'a EstimatorSuite,
    /// Estimator event sink.
    log: &'a L,
}

impl<'a, L: ExperimentLog + ?Sized> SuiteRunner<'a, L> {
    /// Creates a runner.
    #[must_use]
    pub const fn new(suite: &'a EstimatorSuite, log: &'a L) -> Self {
        Self {
            suite,
            log,
        }
    }
}

impl<L: ExperimentLog + ?Sized> TrialRunner for SuiteRunner<'_, L> {
    fn run(&self, method: Method, instance: &ProblemInstance) -> TrialOutcome {
        run_trial(self.suite.estimator(method), instance, self.log)
    }
}

// ============================================================================
// SECTION: Trial Table
// ============================================================================

/// Per-method outcomes for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialTable {
    /// Outcomes keyed by method.
    outcomes: BTreeMap<Method, TrialOutcome>,
}

impl TrialTable {
    /// Inserts or replaces the outcome for its method.
    pub fn insert(&mut self, outcome: TrialOutcome) {
        self.outcomes.insert(outcome.method, outcome);
    }

    /// Returns the outcome for `method`.
    #[must_use]
    pub fn get(&self, method: Method) -> Option<&TrialOutcome> {
        self.outcomes.get(&method)
    }

    /// Iterates outcomes in method order.
    pub fn iter(&self) -> impl Iterator<Item = &TrialOutcome> {
        self.outcomes.values()
    }

    /// Returns the number of recorded methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true when no method was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Renders a `(method, time, solved, correct bits)` grid.
    #[must_use]
    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .iter()
            .map(|outcome| {
                vec![
                    outcome.method.to_string(),
                    format!("{:.3}", outcome.elapsed.as_secs_f64()),
                    outcome.success.to_string(),
                    outcome.matching.to_string(),
                ]
            })
            .collect();
        render_grid(&["method", "time (s)", "solved", "correct bits"], &rows)
    }
}
