// crates/ilwe-core/src/core/method.rs
// ============================================================================
// Module: Estimation Methods
// Description: Closed registry of the five estimation methods.
// Purpose: Map estimator kinds to stable labels and store identifiers.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`Method`] is the closed set of estimators. Its registry identifiers are
//! persisted as foreign keys, so they must never be renumbered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Method
// ============================================================================

/// Estimation method.
///
/// # Invariants
/// - `registry_id` values are stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Big-M integer program (exact reference).
    Ilp,
    /// Least absolute deviations linear program.
    L1,
    /// Ordinary least squares.
    L2,
    /// Huber-loss convex program.
    Huber,
    /// Cauchy iteratively reweighted least squares.
    Cauchy,
}

impl Method {
    /// All methods in registry order.
    pub const ALL: [Self; 5] = [Self::Ilp, Self::L1, Self::L2, Self::Huber, Self::Cauchy];

    /// Returns the stable display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ilp => "ILP",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::Huber => "huber",
            Self::Cauchy => "cauchy",
        }
    }

    /// Returns the stable registry identifier.
    #[must_use]
    pub const fn registry_id(self) -> i64 {
        match self {
            Self::Ilp => 1,
            Self::L1 => 2,
            Self::L2 => 3,
            Self::Huber => 4,
            Self::Cauchy => 5,
        }
    }

    /// Resolves a registry identifier.
    #[must_use]
    pub fn from_registry_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.registry_id() == id)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for unknown method names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown estimation method: {0}")]
pub struct MethodParseError(pub String);

impl FromStr for Method {
    type Err = MethodParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| MethodParseError(value.to_string()))
    }
}
