// crates/ilwe-core/src/core/events.rs
// ============================================================================
// Module: Experiment Events
// Description: Structured log payloads for estimators, trials, and searches.
// Purpose: Give every log sink the same JSON-serializable records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events are flat, serializable records with a stable `event` label and a
//! millisecond timestamp. They are emitted through
//! [`crate::interfaces::ExperimentLog`] sinks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::estimate::FailureKind;
use crate::core::estimate::StopReason;
use crate::core::method::Method;

// ============================================================================
// SECTION: Estimator Events
// ============================================================================

/// Estimator completion or failure event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Estimation method.
    pub method: Method,
    /// Failure category when the estimator produced no candidate.
    pub failure: Option<FailureKind>,
    /// Raw failure detail.
    pub detail: Option<String>,
    /// Iterations performed by iterative estimators.
    pub iterations: Option<usize>,
    /// Stop reason reported by iterative estimators.
    pub stop: Option<StopReason>,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u128,
}

impl EstimatorEvent {
    /// Creates an event for an estimator that returned a candidate.
    #[must_use]
    pub fn found(
        method: Method,
        iterations: Option<usize>,
        stop: Option<StopReason>,
        elapsed_ms: u128,
    ) -> Self {
        Self {
            event: "estimator_found",
            timestamp_ms: now_ms(),
            method,
            failure: None,
            detail: None,
            iterations,
            stop,
            elapsed_ms,
        }
    }

    /// Creates an event for an estimator that returned no candidate.
    #[must_use]
    pub fn failed(method: Method, kind: FailureKind, detail: &str, elapsed_ms: u128) -> Self {
        Self {
            event: "estimator_failed",
            timestamp_ms: now_ms(),
            method,
            failure: Some(kind),
            detail: Some(detail.to_string()),
            iterations: None,
            stop: None,
            elapsed_ms,
        }
    }
}

// ============================================================================
// SECTION: Trial Events
// ============================================================================

/// One committed trial of the bisection driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Estimation method.
    pub method: Method,
    /// Number of equations.
    pub samples: usize,
    /// Contamination rate.
    pub contamination: f64,
    /// Instance seed.
    pub seed: u64,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u128,
    /// Whether the secret was recovered.
    pub solved: bool,
}

impl TrialEvent {
    /// Creates a trial event with a consistent timestamp.
    #[must_use]
    pub fn new(
        method: Method,
        samples: usize,
        contamination: f64,
        seed: u64,
        elapsed_ms: u128,
        solved: bool,
    ) -> Self {
        Self {
            event: "trial",
            timestamp_ms: now_ms(),
            method,
            samples,
            contamination,
            seed,
            elapsed_ms,
            solved,
        }
    }
}

// ============================================================================
// SECTION: Search Events
// ============================================================================

/// Search progress classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStep {
    /// Filling missing trials at an already tried sample count.
    FillGap,
    /// Probing a larger sample count to find an upper bound.
    Grow,
    /// Probing a bisection midpoint.
    Bisect,
    /// Search converged.
    Converged,
    /// No sample count below the ceiling met the threshold.
    NoUpperBound,
    /// Search stopped on a cancellation request.
    Cancelled,
}

/// Bisection driver progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Estimation method.
    pub method: Method,
    /// Contamination rate.
    pub contamination: f64,
    /// Search step.
    pub step: SearchStep,
    /// Sample count probed by this step, if any.
    pub samples: Option<usize>,
    /// Smallest sample count meeting the threshold so far.
    pub m_good: Option<usize>,
    /// Largest sample count missing the threshold so far.
    pub m_bad: Option<usize>,
}

impl SearchEvent {
    /// Creates a search event with a consistent timestamp.
    #[must_use]
    pub fn new(method: Method, contamination: f64, step: SearchStep) -> Self {
        Self {
            event: "search",
            timestamp_ms: now_ms(),
            method,
            contamination,
            step,
            samples: None,
            m_good: None,
            m_bad: None,
        }
    }

    /// Sets the probed sample count.
    #[must_use]
    pub const fn with_samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Sets the current bisection bracket.
    #[must_use]
    pub const fn with_bracket(mut self, m_good: Option<usize>, m_bad: Option<usize>) -> Self {
        self.m_good = m_good;
        self.m_bad = m_bad;
        self
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix epoch in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
