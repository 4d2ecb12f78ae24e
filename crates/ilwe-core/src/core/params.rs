// crates/ilwe-core/src/core/params.rs
// ============================================================================
// Module: ILWE Instance Parameters
// Description: Identifying tuples for synthetic instances and security levels.
// Purpose: Provide stable, serializable parameter types shared by all layers.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An instance is identified by `(m, n, eta, tau, p, seed)`. The first three
//! structural values `(n, eta, tau)` form a [`ParameterFamily`], which is fixed
//! for a whole search and usually derived from a [`SecurityLevel`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Secret dimension used by every ML-DSA security level.
pub const DEFAULT_DIMENSION: usize = 256;

// ============================================================================
// SECTION: Security Levels
// ============================================================================

/// NIST security level of the attacked ML-DSA parameter set.
///
/// # Invariants
/// - Each level maps to a fixed `(eta, tau)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityLevel {
    /// NIST level 2: eta = 2, tau = 39.
    #[default]
    Level2,
    /// NIST level 3: eta = 4, tau = 49.
    Level3,
    /// NIST level 5: eta = 2, tau = 60.
    Level5,
}

impl SecurityLevel {
    /// Returns the secret coefficient half-width.
    #[must_use]
    pub const fn eta(self) -> i64 {
        match self {
            Self::Level2 | Self::Level5 => 2,
            Self::Level3 => 4,
        }
    }

    /// Returns the number of nonzero entries per challenge row.
    #[must_use]
    pub const fn tau(self) -> usize {
        match self {
            Self::Level2 => 39,
            Self::Level3 => 49,
            Self::Level5 => 60,
        }
    }

    /// Returns the numeric NIST level.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::Level5 => 5,
        }
    }

    /// Returns the parameter family for the given secret dimension.
    #[must_use]
    pub const fn family(self, dimension: usize) -> ParameterFamily {
        ParameterFamily {
            dimension,
            eta: self.eta(),
            tau: self.tau(),
        }
    }
}

/// Error returned for unsupported NIST levels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported security level {0} (expected 2, 3 or 5)")]
pub struct SecurityLevelError(pub u8);

impl TryFrom<u8> for SecurityLevel {
    type Error = SecurityLevelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Level2),
            3 => Ok(Self::Level3),
            5 => Ok(Self::Level5),
            other => Err(SecurityLevelError(other)),
        }
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.number()
    }
}

// ============================================================================
// SECTION: Parameter Family
// ============================================================================

/// Structural parameters shared by every instance of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterFamily {
    /// Secret dimension `n`.
    pub dimension: usize,
    /// Secret coefficient half-width `eta`.
    pub eta: i64,
    /// Nonzero entries per row `tau`.
    pub tau: usize,
}

impl ParameterFamily {
    /// Builds the full identifying tuple for one instance of this family.
    #[must_use]
    pub const fn instance(self, samples: usize, contamination: f64, seed: u64) -> InstanceParams {
        InstanceParams {
            samples,
            dimension: self.dimension,
            eta: self.eta,
            tau: self.tau,
            contamination,
            seed,
        }
    }
}

// ============================================================================
// SECTION: Instance Parameters
// ============================================================================

/// Identifying tuple of a synthetic instance.
///
/// # Invariants
/// - Regenerating from the same tuple yields an identical instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceParams {
    /// Number of equations `m`.
    pub samples: usize,
    /// Secret dimension `n`.
    pub dimension: usize,
    /// Secret coefficient half-width `eta`.
    pub eta: i64,
    /// Nonzero entries per row `tau`.
    pub tau: usize,
    /// Contamination rate `p` in `[0, 1]`.
    pub contamination: f64,
    /// PRNG seed.
    pub seed: u64,
}

impl InstanceParams {
    /// Returns the structural family of this instance.
    #[must_use]
    pub const fn family(&self) -> ParameterFamily {
        ParameterFamily {
            dimension: self.dimension,
            eta: self.eta,
            tau: self.tau,
        }
    }

    /// Returns the default observation bound, which equals `tau`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "tau is a small row weight.")]
    pub const fn default_clip(&self) -> f64 {
        self.tau as f64
    }
}
