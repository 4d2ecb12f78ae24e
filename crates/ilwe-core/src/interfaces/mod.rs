// crates/ilwe-core/src/interfaces/mod.rs
// ============================================================================
// Module: ILWE Interfaces
// Description: Contract surfaces for estimators, stores, logs, and cancellation.
// Purpose: Decouple the bisection driver from concrete backends.
// Dependencies: crate::core, crate::generator
// ============================================================================

//! ## Overview
//! Interfaces define how the experiment engine integrates with solvers,
//! durable storage, logging pipelines, and external stop signals without
//! embedding backend-specific details.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::AggregateQuery;
use crate::core::Estimate;
use crate::core::EstimatorEvent;
use crate::core::InstanceId;
use crate::core::InstanceParams;
use crate::core::LinearSystem;
use crate::core::Method;
use crate::core::ParameterFamily;
use crate::core::ProblemInstance;
use crate::core::RunRecord;
use crate::core::SampleAggregate;
use crate::core::SearchEvent;
use crate::core::StoredInstance;
use crate::core::TrialEvent;
use crate::core::TrialOutcome;
use crate::generator::generate;

// ============================================================================
// SECTION: Estimator
// ============================================================================

/// Robust estimator recovering an integer secret from a linear system.
pub trait Estimator {
    /// Returns the method implemented by this estimator.
    fn method(&self) -> Method;

    /// Estimates the secret of `system`.
    ///
    /// `oracle` carries the true secret in synthetic experiments. Estimators
    /// may only use it for early stopping, never to shape the estimate.
    fn solve(&self, system: &LinearSystem, oracle: Option<&[i64]>) -> Estimate;
}

/// Runs and scores one estimator trial for the bisection driver.
pub trait TrialRunner {
    /// Runs `method` on `instance` and scores the estimate against its secret.
    fn run(&self, method: Method, instance: &ProblemInstance) -> TrialOutcome;
}

// ============================================================================
// SECTION: Experiment Store
// ============================================================================

/// Experiment store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("store error: {0}")]
    Store(String),
    /// Store data is corrupt.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store received or returned invalid data.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// Durable record of generated instances and estimator runs.
pub trait ExperimentStore {
    /// Looks up an instance by its identifying tuple.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn find_instance(
        &self,
        params: &InstanceParams,
    ) -> Result<Option<StoredInstance>, StoreError>;

    /// Inserts an instance unless its identifying tuple already exists.
    ///
    /// Returns the (possibly pre-existing) row; a pre-existing row keeps the
    /// clip it was first stored with.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn insert_instance(
        &self,
        params: &InstanceParams,
        errors: usize,
        clip: f64,
    ) -> Result<StoredInstance, StoreError>;

    /// Appends a run record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be committed.
    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError>;

    /// Returns the seeds that already have a run for `method` at `(m, p)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn completed_seeds(
        &self,
        method: Method,
        family: &ParameterFamily,
        samples: usize,
        contamination: f64,
    ) -> Result<BTreeSet<u64>, StoreError>;

    /// Returns per-(m, p) success counts for `method`, ordered by `(p, m)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn query_aggregates(
        &self,
        method: Method,
        query: &AggregateQuery,
    ) -> Result<Vec<SampleAggregate>, StoreError>;

    /// Regenerates the instance for `params` and returns its persisted handle.
    ///
    /// The instance is inserted on first use; later calls reuse the same row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the row was generated under a
    /// different clip, or another [`StoreError`] when the store is unavailable.
    fn get_or_create_instance(
        &self,
        params: &InstanceParams,
        clip: f64,
    ) -> Result<(InstanceId, ProblemInstance), StoreError> {
        let instance = generate(params, clip);
        let stored = match self.find_instance(params)? {
            Some(stored) => stored,
            None => self.insert_instance(params, instance.error_count(), clip)?,
        };
        if stored.clip.total_cmp(&clip).is_ne() {
            return Err(StoreError::Invalid(format!(
                "instance {} was generated with clip {}, not {clip}",
                stored.id.get(),
                stored.clip
            )));
        }
        Ok((stored.id, instance))
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative stop signal consulted at driver checkpoints.
pub trait CancellationToken {
    /// Returns true when the driver should stop at the next checkpoint.
    fn should_stop(&self) -> bool;
}

// ============================================================================
// SECTION: Experiment Log
// ============================================================================

/// Sink for structured experiment events.
pub trait ExperimentLog: Send + Sync {
    /// Records an estimator completion or failure.
    fn record_estimator(&self, event: &EstimatorEvent);

    /// Records a committed trial.
    fn record_trial(&self, _event: &TrialEvent) {}

    /// Records a search progress step.
    fn record_search(&self, _event: &SearchEvent) {}
}
