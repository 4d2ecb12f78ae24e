// crates/ilwe-core/src/generator.rs
// ============================================================================
// Module: Instance Generator
// Description: Deterministic synthetic CILWE instance generation.
// Purpose: Produce contaminated sparse linear systems from a parameter tuple.
// Dependencies: crate::core, nalgebra, rand, rand_chacha
// ============================================================================

//! ## Overview
//! [`generate`] draws a secret in `[-eta, eta]^n`, sparse `+-1` rows with
//! exactly `tau` nonzeros, and contaminates each equation with probability
//! `p`. Contaminated errors are rejection-sampled so the observation stays
//! within `clip`; afterwards any equation whose observation still exceeds
//! `clip` is replaced by a fresh, error-free equation until exactly `m` valid
//! equations remain. All randomness comes from a `ChaCha8` stream seeded with
//! the instance seed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use nalgebra::DMatrix;
use nalgebra::DVector;
use rand::Rng;
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;

use crate::core::InstanceParams;
use crate::core::LinearSystem;
use crate::core::ProblemInstance;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Contaminated errors are drawn from `[-ERROR_SPREAD * tau, ERROR_SPREAD * tau)`.
const ERROR_SPREAD: f64 = 4.0;

// ============================================================================
// SECTION: Equations
// ============================================================================

/// One sparse equation before assembly.
#[derive(Debug, Clone)]
struct Equation {
    /// Nonzero `(column, +-1)` entries.
    entries: Vec<(usize, f64)>,
    /// Error term added to the clean observation.
    error: f64,
}

impl Equation {
    /// Returns `A_i . secret` without the error term.
    #[allow(clippy::cast_precision_loss, reason = "Secret coefficients are tiny.")]
    fn clean(&self, secret: &[i64]) -> f64 {
        self.entries.iter().map(|(column, sign)| sign * secret[*column] as f64).sum()
    }

    /// Returns the observed value `A_i . secret + e_i`.
    fn observation(&self, secret: &[i64]) -> f64 {
        self.clean(secret) + self.error
    }
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates the instance identified by `params`.
///
/// Degenerate parameters (`tau > n`, `eta < 0`) are clamped rather than
/// rejected; choosing sensible values is the caller's responsibility.
#[must_use]
pub fn generate(params: &InstanceParams, clip: f64) -> ProblemInstance {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let dimension = params.dimension;
    let tau = params.tau.min(dimension);
    let eta = params.eta.max(0);

    let secret: Vec<i64> = (0 .. dimension).map(|_| rng.gen_range(-eta ..= eta)).collect();

    let mut equations: Vec<Equation> = Vec::with_capacity(params.samples);
    for _ in 0 .. params.samples {
        let entries = sample_row(&mut rng, dimension, tau);
        let mut equation = Equation {
            entries,
            error: 0.0,
        };
        equation.error =
            sample_error(&mut rng, equation.clean(&secret), tau, params.contamination, clip);
        equations.push(equation);
    }

    // Replace out-of-bound equations with error-free ones until all m fit.
    loop {
        equations.retain(|equation| equation.observation(&secret).abs() <= clip);
        if equations.len() == params.samples {
            break;
        }
        while equations.len() < params.samples {
            equations.push(Equation {
                entries: sample_row(&mut rng, dimension, tau),
                error: 0.0,
            });
        }
    }

    let mut matrix = DMatrix::<f64>::zeros(params.samples, dimension);
    let mut observations = DVector::<f64>::zeros(params.samples);
    let mut errors = DVector::<f64>::zeros(params.samples);
    for (row, equation) in equations.iter().enumerate() {
        for (column, sign) in &equation.entries {
            matrix[(row, *column)] = *sign;
        }
        observations[row] = equation.observation(&secret);
        errors[row] = equation.error;
    }

    ProblemInstance::from_parts(
        *params,
        clip,
        LinearSystem::assemble(matrix, observations, eta),
        errors,
        secret,
    )
}

/// Samples `tau` distinct columns with random signs.
fn sample_row(rng: &mut ChaCha8Rng, dimension: usize, tau: usize) -> Vec<(usize, f64)> {
    index::sample(rng, dimension, tau)
        .into_iter()
        .map(|column| (column, if rng.gen_bool(0.5) { 1.0 } else { -1.0 }))
        .collect()
}

/// Samples the error of one equation.
///
/// With probability `contamination` a candidate is drawn uniformly from
/// `[-4 tau, 4 tau)` until the observation fits `clip`, then truncated toward
/// zero. Rows whose clean value cannot be brought within `clip` stay
/// error-free and are handled by the replacement pass.
#[allow(clippy::cast_precision_loss, reason = "tau is a small row weight.")]
fn sample_error(
    rng: &mut ChaCha8Rng,
    clean: f64,
    tau: usize,
    contamination: f64,
    clip: f64,
) -> f64 {
    if rng.gen_range(0.0 .. 1.0) >= contamination {
        return 0.0;
    }
    let spread = ERROR_SPREAD * tau as f64;
    if spread <= 0.0 || clean.abs() - clip >= spread {
        return 0.0;
    }
    loop {
        let candidate = rng.gen_range(-spread .. spread);
        if (clean + candidate).abs() <= clip {
            return candidate.trunc();
        }
    }
}
