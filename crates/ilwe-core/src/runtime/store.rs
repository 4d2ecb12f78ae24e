// crates/ilwe-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Experiment Store
// Description: Process-local implementation of the experiment store contract.
// Purpose: Back tests and throwaway searches without a database.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Instances and runs live in vectors behind a mutex. Identifiers are
//! 1-based positions in the instance vector, mirroring database row ids.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::core::AggregateQuery;
use crate::core::InstanceId;
use crate::core::InstanceParams;
use crate::core::Method;
use crate::core::ParameterFamily;
use crate::core::RunRecord;
use crate::core::SampleAggregate;
use crate::core::StoredInstance;
use crate::interfaces::ExperimentStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Stored instance row.
#[derive(Debug, Clone, Copy)]
struct InstanceRow {
    /// Identifying tuple.
    params: InstanceParams,
    /// Number of contaminated equations.
    errors: usize,
    /// Clip bound used at generation.
    clip: f64,
}

/// Mutable store state.
#[derive(Debug, Default)]
struct StoreState {
    /// Instances by position (id = position + 1).
    instances: Vec<InstanceRow>,
    /// Append-only run log.
    runs: Vec<RunRecord>,
}

/// In-memory experiment store.
#[derive(Debug, Default)]
pub struct InMemoryExperimentStore {
    /// Guarded store state.
    state: Mutex<StoreState>,
}

impl InMemoryExperimentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn runs(&self) -> Result<Vec<RunRecord>, StoreError> {
        Ok(self.lock()?.runs.clone())
    }

    /// Returns the number of contaminated equations recorded for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn error_count(&self, id: InstanceId) -> Result<Option<usize>, StoreError> {
        let state = self.lock()?;
        Ok(row_index(id).and_then(|index| state.instances.get(index)).map(|row| row.errors))
    }

    /// Locks the state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("store mutex poisoned".to_string()))
    }
}

/// Converts an identifier to a vector position.
fn row_index(id: InstanceId) -> Option<usize> {
    usize::try_from(id.get()).ok()?.checked_sub(1)
}

/// Converts a vector position to an identifier.
fn row_id(index: usize) -> Result<InstanceId, StoreError> {
    i64::try_from(index + 1)
        .map(InstanceId::from_raw)
        .map_err(|_| StoreError::Invalid("instance id overflow".to_string()))
}

impl StoreState {
    /// Finds the position of an instance tuple.
    fn position(&self, params: &InstanceParams) -> Option<usize> {
        self.instances.iter().position(|row| row.params == *params)
    }

    /// Returns the stored handle at a position.
    fn stored(&self, index: usize) -> Result<StoredInstance, StoreError> {
        let row = self
            .instances
            .get(index)
            .ok_or_else(|| StoreError::Corrupt(format!("instance position {index} missing")))?;
        Ok(StoredInstance {
            id: row_id(index)?,
            clip: row.clip,
        })
    }
}

impl ExperimentStore for InMemoryExperimentStore {
    fn find_instance(
        &self,
        params: &InstanceParams,
    ) -> Result<Option<StoredInstance>, StoreError> {
        let state = self.lock()?;
        state.position(params).map(|index| state.stored(index)).transpose()
    }

    fn insert_instance(
        &self,
        params: &InstanceParams,
        errors: usize,
        clip: f64,
    ) -> Result<StoredInstance, StoreError> {
        let mut state = self.lock()?;
        if let Some(index) = state.position(params) {
            return state.stored(index);
        }
        state.instances.push(InstanceRow {
            params: *params,
            errors,
            clip,
        });
        state.stored(state.instances.len() - 1)
    }

    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let known = row_index(run.instance_id).is_some_and(|index| index < state.instances.len());
        if !known {
            return Err(StoreError::Invalid(format!(
                "unknown instance id {}",
                run.instance_id.get()
            )));
        }
        state.runs.push(run.clone());
        Ok(())
    }

    #[allow(clippy::float_cmp, reason = "Rates are stored and queried verbatim.")]
    fn completed_seeds(
        &self,
        method: Method,
        family: &ParameterFamily,
        samples: usize,
        contamination: f64,
    ) -> Result<BTreeSet<u64>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|run| run.method == method)
            .filter_map(|run| row_index(run.instance_id).and_then(|index| state.instances.get(index)))
            .map(|row| row.params)
            .filter(|params| {
                params.family() == *family
                    && params.samples == samples
                    && params.contamination == contamination
            })
            .map(|params| params.seed)
            .collect())
    }

    #[allow(clippy::float_cmp, reason = "Rates are stored and queried verbatim.")]
    fn query_aggregates(
        &self,
        method: Method,
        query: &AggregateQuery,
    ) -> Result<Vec<SampleAggregate>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<SampleAggregate> = Vec::new();
        for run in state.runs.iter().filter(|run| run.method == method) {
            let Some(instance) = row_index(run.instance_id).and_then(|index| state.instances.get(index))
            else {
                continue;
            };
            let params = instance.params;
            if params.family() != query.family
                || !query.matches(params.samples, params.contamination)
            {
                continue;
            }
            let existing = rows.iter().position(|row| {
                row.samples == params.samples && row.contamination == params.contamination
            });
            let index = existing.unwrap_or_else(|| {
                rows.push(SampleAggregate {
                    samples: params.samples,
                    contamination: params.contamination,
                    solved: 0,
                    attempts: 0,
                });
                rows.len() - 1
            });
            let row = &mut rows[index];
            row.attempts += 1;
            if run.solved {
                row.solved += 1;
            }
        }
        rows.sort_by(|left, right| {
            left.contamination
                .total_cmp(&right.contamination)
                .then(left.samples.cmp(&right.samples))
        });
        Ok(rows)
    }
}
