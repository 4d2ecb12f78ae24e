// crates/ilwe-core/src/core/records.rs
// ============================================================================
// Module: Persisted Records
// Description: Instance handles, run records, and aggregate rows.
// Purpose: Define the data exchanged with experiment stores.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! These types mirror the three persisted relations: instances (by identifying
//! tuple), the static method registry, and the append-only run log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::core::method::Method;
use crate::core::params::ParameterFamily;

// ============================================================================
// SECTION: Instance Handle
// ============================================================================

/// Store-assigned instance identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(i64);

impl InstanceId {
    /// Wraps a raw store identifier.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw store identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// Persisted instance handle with the clip bound it was generated under.
///
/// The clip is not part of the identifying tuple, so a store keeps the value
/// an instance was first generated with and rejects lookups under another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredInstance {
    /// Store-assigned identifier.
    pub id: InstanceId,
    /// Observation clip bound used at generation.
    pub clip: f64,
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// Append-only record of one estimator run on one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Instance the run was performed on.
    pub instance_id: InstanceId,
    /// Estimation method.
    pub method: Method,
    /// Wall-clock time spent in the estimator.
    pub elapsed: Duration,
    /// Whether the rounded estimate equalled the secret.
    pub solved: bool,
    /// Unix timestamp (seconds) of the run.
    pub timestamp: i64,
}

impl RunRecord {
    /// Creates a run record stamped with the current time.
    #[must_use]
    pub fn now(instance_id: InstanceId, method: Method, elapsed: Duration, solved: bool) -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            instance_id,
            method,
            elapsed,
            solved,
            timestamp: i64::try_from(now.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

// ============================================================================
// SECTION: Aggregates
// ============================================================================

/// Filter for aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateQuery {
    /// Structural parameters every row must match.
    pub family: ParameterFamily,
    /// Optional sample count filter.
    pub samples: Option<usize>,
    /// Optional contamination rate filter.
    pub contamination: Option<f64>,
}

impl AggregateQuery {
    /// Queries every sample count for one contamination rate.
    #[must_use]
    pub const fn for_rate(family: ParameterFamily, contamination: f64) -> Self {
        Self {
            family,
            samples: None,
            contamination: Some(contamination),
        }
    }

    /// Queries every sample count and contamination rate.
    #[must_use]
    pub const fn all(family: ParameterFamily) -> Self {
        Self {
            family,
            samples: None,
            contamination: None,
        }
    }

    /// Returns true when an aggregate row matches this filter.
    #[must_use]
    #[allow(clippy::float_cmp, reason = "Rates are stored and queried verbatim.")]
    pub fn matches(&self, samples: usize, contamination: f64) -> bool {
        self.samples.is_none_or(|value| value == samples)
            && self.contamination.is_none_or(|value| value == contamination)
    }
}

/// Per-(m, p) success counts for one method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleAggregate {
    /// Number of equations.
    pub samples: usize,
    /// Contamination rate.
    pub contamination: f64,
    /// Number of solved runs.
    pub solved: u64,
    /// Number of recorded runs.
    pub attempts: u64,
}

impl SampleAggregate {
    /// Returns the number of failed runs.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.attempts.saturating_sub(self.solved)
    }

    /// Returns the observed success rate (zero when nothing ran).
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Run counts stay far below 2^52.")]
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.solved as f64 / self.attempts as f64
    }
}
