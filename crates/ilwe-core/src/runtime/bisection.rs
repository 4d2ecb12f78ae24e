// crates/ilwe-core/src/runtime/bisection.rs
// ============================================================================
// Module: Bisection Driver
// Description: Resumable search for the smallest sufficient sample count.
// Purpose: Find, per (method, p), the m at which success crosses a threshold.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The driver works entirely from the store's aggregates, so a restarted
//! search resumes where the previous one stopped:
//!
//! - **Growth**: fill incomplete sample counts first, then probe `n / (1 - p)`
//!   (first probe) or twice the largest tried `m` until some `m` meets the
//!   success threshold or the ceiling is reached.
//! - **Bisection**: bracket the threshold between the smallest good `m` and
//!   the largest bad `m`, filling midpoints until the ratio falls to the
//!   convergence ratio or the midpoint cannot move.
//!
//! Filling a sample count runs seeds in increasing order, skips seeds already
//! on record, and stops once the threshold can no longer be met.
//! The cancellation token is consulted before every phase step and every
//! trial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AggregateQuery;
use crate::core::DEFAULT_DIMENSION;
use crate::core::Method;
use crate::core::ParameterFamily;
use crate::core::RunRecord;
use crate::core::SampleAggregate;
use crate::core::SearchEvent;
use crate::core::SearchStep;
use crate::core::SecurityLevel;
use crate::core::TrialEvent;
use crate::interfaces::CancellationToken;
use crate::interfaces::ExperimentLog;
use crate::interfaces::ExperimentStore;
use crate::interfaces::StoreError;
use crate::interfaces::TrialRunner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default trials per sample count.
pub const DEFAULT_ATTEMPTS: u32 = 100;
/// Default success rate a sample count must reach.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.95;
/// Default sample-count ceiling for the growth phase.
pub const DEFAULT_MAX_SAMPLES: usize = 41_000;
/// Default `m_good / m_bad` ratio at which bisection stops.
pub const DEFAULT_CONVERGENCE_RATIO: f64 = 1.01;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Immutable search configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Structural parameters of every generated instance.
    pub family: ParameterFamily,
    /// Observation bound passed to the generator.
    pub clip: f64,
    /// Trials per sample count.
    pub attempts: u32,
    /// Success rate a sample count must reach.
    pub success_threshold: f64,
    /// Growth ceiling; reaching it ends the search without an upper bound.
    pub max_samples: usize,
    /// `m_good / m_bad` ratio at which bisection stops.
    pub convergence_ratio: f64,
    /// Assumed bad sample count when no tried `m` misses the threshold.
    pub lower_bound: usize,
}

impl SearchConfig {
    /// Returns the defaults for a security level at the given dimension.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "tau is a small row weight.")]
    pub const fn for_level(level: SecurityLevel, dimension: usize) -> Self {
        Self {
            family: level.family(dimension),
            clip: level.tau() as f64,
            attempts: DEFAULT_ATTEMPTS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            max_samples: DEFAULT_MAX_SAMPLES,
            convergence_ratio: DEFAULT_CONVERGENCE_RATIO,
            lower_bound: dimension,
        }
    }

    /// Returns the failure count at which the threshold becomes unreachable.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The rounded value lies in [0, attempts]."
    )]
    pub fn max_failures(&self) -> u64 {
        let allowed = ((1.0 - self.success_threshold) * f64::from(self.attempts)).round();
        (allowed.max(0.0) as u64).max(1)
    }

    /// Returns true when a sample count needs no further trials.
    #[must_use]
    pub fn is_complete(&self, aggregate: &SampleAggregate) -> bool {
        aggregate.attempts >= u64::from(self.attempts)
            || aggregate.failures() >= self.max_failures()
    }

    /// Returns true when a sample count meets the success threshold.
    #[must_use]
    pub fn is_good(&self, aggregate: &SampleAggregate) -> bool {
        aggregate.success_rate() >= self.success_threshold
    }

    /// Returns the first growth probe `n / (1 - p)`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "The probe is clamped to the sample ceiling before conversion."
    )]
    pub fn initial_samples(&self, contamination: f64) -> usize {
        let clean = 1.0 - contamination;
        if clean <= 0.0 {
            return self.max_samples;
        }
        let probe = (self.family.dimension as f64 / clean).floor();
        if probe >= self.max_samples as f64 { self.max_samples } else { (probe as usize).max(1) }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::for_level(SecurityLevel::default(), DEFAULT_DIMENSION)
    }
}

// ============================================================================
// SECTION: Outcomes and Errors
// ============================================================================

/// Terminal state of one `(method, p)` search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The threshold lies in `(m_bad, m_good]`.
    Converged {
        /// Smallest sample count meeting the threshold.
        m_good: usize,
        /// Largest sample count missing it (or the lower bound).
        m_bad: usize,
    },
    /// No sample count below the ceiling met the threshold.
    NoUpperBound {
        /// Largest sample count tried, if any.
        largest_tried: Option<usize>,
    },
    /// A stop was requested; every committed run is on record.
    Cancelled,
}

/// Errors that abort a search.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The experiment store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of filling one sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    /// Every needed trial ran.
    Done,
    /// A stop was requested mid-fill.
    Cancelled,
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Bisection driver over injected store, runner, token, and log.
pub struct BisectionDriver<'a, S, R, C, L>
where
    S: ExperimentStore + ?Sized,
    R: TrialRunner + ?Sized,
    C: CancellationToken + ?Sized,
    L: ExperimentLog + ?Sized,
{
    /// Search configuration.
    config: SearchConfig,
    /// Durable record of instances and runs.
    store: &'a S,
    /// Trial executor.
    runner: &'a R,
    /// Stop signal.
    cancel: &'a C,
    /// Event sink.
    log: &'a L,
}

impl<'a, S, R, C, L> BisectionDriver<'a, S, R, C, L>
where
    S: ExperimentStore + ?Sized,
    R: TrialRunner + ?Sized,
    C: CancellationToken + ?Sized,
    L: ExperimentLog + ?Sized,
{
    /// Creates a driver.
    #[must_use]
    pub const fn new(
        config: SearchConfig,
        store: &'a S,
        runner: &'a R,
        cancel: &'a C,
        log: &'a L,
    ) -> Self {
        Self {
            config,
            store,
            runner,
            cancel,
            log,
        }
    }

    /// Returns the search configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches the smallest sufficient sample count for `(method, p)`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the store fails. Runs committed before
    /// the failure remain on record.
    pub fn search(&self, method: Method, contamination: f64) -> Result<SearchOutcome, DriverError> {
        if let Some(outcome) = self.grow(method, contamination)? {
            return Ok(outcome);
        }
        self.bisect(method, contamination)
    }

    /// Growth phase; returns `None` once an upper bound exists.
    fn grow(&self, method: Method, contamination: f64) -> Result<Option<SearchOutcome>, DriverError> {
        loop {
            if self.cancel.should_stop() {
                return Ok(Some(self.cancelled(method, contamination)));
            }
            let rows = self.aggregates(method, contamination)?;
            if let Some(gap) = self.first_gap(&rows) {
                self.log.record_search(
                    &SearchEvent::new(method, contamination, SearchStep::FillGap).with_samples(gap),
                );
                if self.fill(method, gap, contamination)? == Fill::Cancelled {
                    return Ok(Some(self.cancelled(method, contamination)));
                }
                continue;
            }
            if rows.iter().any(|row| self.config.is_good(row)) {
                return Ok(None);
            }
            let largest = rows.iter().map(|row| row.samples).max();
            let next = match largest {
                Some(samples) => samples.saturating_mul(2),
                None => self.config.initial_samples(contamination),
            };
            if next >= self.config.max_samples {
                self.log.record_search(
                    &SearchEvent::new(method, contamination, SearchStep::NoUpperBound)
                        .with_bracket(None, largest),
                );
                return Ok(Some(SearchOutcome::NoUpperBound {
                    largest_tried: largest,
                }));
            }
            self.log.record_search(
                &SearchEvent::new(method, contamination, SearchStep::Grow).with_samples(next),
            );
            if self.fill(method, next, contamination)? == Fill::Cancelled {
                return Ok(Some(self.cancelled(method, contamination)));
            }
        }
    }

    /// Bisection phase.
    fn bisect(&self, method: Method, contamination: f64) -> Result<SearchOutcome, DriverError> {
        loop {
            if self.cancel.should_stop() {
                return Ok(self.cancelled(method, contamination));
            }
            let rows = self.aggregates(method, contamination)?;
            if let Some(gap) = self.first_gap(&rows) {
                self.log.record_search(
                    &SearchEvent::new(method, contamination, SearchStep::FillGap).with_samples(gap),
                );
                if self.fill(method, gap, contamination)? == Fill::Cancelled {
                    return Ok(self.cancelled(method, contamination));
                }
                continue;
            }

            let good = rows.iter().filter(|row| self.config.is_good(row)).map(|row| row.samples).min();
            let Some(m_good) = good else {
                let largest_tried = rows.iter().map(|row| row.samples).max();
                self.log.record_search(
                    &SearchEvent::new(method, contamination, SearchStep::NoUpperBound)
                        .with_bracket(None, largest_tried),
                );
                return Ok(SearchOutcome::NoUpperBound {
                    largest_tried,
                });
            };
            let m_bad = rows
                .iter()
                .filter(|row| !self.config.is_good(row))
                .map(|row| row.samples)
                .max()
                .unwrap_or(self.config.lower_bound);

            let midpoint = m_bad + m_good.saturating_sub(m_bad) / 2;
            if self.within_ratio(m_good, m_bad) || midpoint == m_bad || midpoint >= m_good {
                self.log.record_search(
                    &SearchEvent::new(method, contamination, SearchStep::Converged)
                        .with_bracket(Some(m_good), Some(m_bad)),
                );
                return Ok(SearchOutcome::Converged {
                    m_good,
                    m_bad,
                });
            }

            self.log.record_search(
                &SearchEvent::new(method, contamination, SearchStep::Bisect)
                    .with_samples(midpoint)
                    .with_bracket(Some(m_good), Some(m_bad)),
            );
            if self.fill(method, midpoint, contamination)? == Fill::Cancelled {
                return Ok(self.cancelled(method, contamination));
            }
        }
    }

    /// Runs the missing trials of one sample count.
    fn fill(&self, method: Method, samples: usize, contamination: f64) -> Result<Fill, DriverError> {
        let family = self.config.family;
        let done = self.store.completed_seeds(method, &family, samples, contamination)?;
        let query = AggregateQuery {
            family,
            samples: Some(samples),
            contamination: Some(contamination),
        };
        let mut failures: u64 = self
            .store
            .query_aggregates(method, &query)?
            .iter()
            .map(SampleAggregate::failures)
            .sum();
        let max_failures = self.config.max_failures();

        for seed in 0 .. u64::from(self.config.attempts) {
            if failures >= max_failures {
                break;
            }
            if done.contains(&seed) {
                continue;
            }
            if self.cancel.should_stop() {
                return Ok(Fill::Cancelled);
            }
            let params = family.instance(samples, contamination, seed);
            let (instance_id, instance) =
                self.store.get_or_create_instance(&params, self.config.clip)?;
            let outcome = self.runner.run(method, &instance);
            self.store.record_run(&RunRecord::now(
                instance_id,
                method,
                outcome.elapsed,
                outcome.success,
            ))?;
            self.log.record_trial(&TrialEvent::new(
                method,
                samples,
                contamination,
                seed,
                outcome.elapsed.as_millis(),
                outcome.success,
            ));
            if !outcome.success {
                failures += 1;
            }
        }
        Ok(Fill::Done)
    }

    /// Loads aggregates for one contamination rate.
    fn aggregates(
        &self,
        method: Method,
        contamination: f64,
    ) -> Result<Vec<SampleAggregate>, DriverError> {
        let query = AggregateQuery::for_rate(self.config.family, contamination);
        Ok(self.store.query_aggregates(method, &query)?)
    }

    /// Returns the smallest tried sample count that still needs trials.
    fn first_gap(&self, rows: &[SampleAggregate]) -> Option<usize> {
        rows.iter().filter(|row| !self.config.is_complete(row)).map(|row| row.samples).min()
    }

    /// Returns true when `m_good / m_bad` is within the convergence ratio.
    #[allow(clippy::cast_precision_loss, reason = "Sample counts stay far below 2^52.")]
    fn within_ratio(&self, m_good: usize, m_bad: usize) -> bool {
        m_good as f64 <= self.config.convergence_ratio * m_bad as f64
    }

    /// Logs and returns the cancelled outcome.
    fn cancelled(&self, method: Method, contamination: f64) -> SearchOutcome {
        self.log.record_search(&SearchEvent::new(method, contamination, SearchStep::Cancelled));
        SearchOutcome::Cancelled
    }
}
