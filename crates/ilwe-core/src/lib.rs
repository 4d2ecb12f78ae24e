// crates/ilwe-core/src/lib.rs
// ============================================================================
// Module: ILWE Core Library
// Description: Public API surface for the CILWE estimation engine.
// Purpose: Expose core types, estimators, interfaces, and runtime helpers.
// Dependencies: crate::{core, estimators, generator, interfaces, recovery, runtime}
// ============================================================================

//! ## Overview
//! ILWE core generates concealed integer-LWE instances, recovers their
//! secrets with five robust estimators, and searches the smallest number of
//! equations each estimator needs at a given contamination rate. Storage,
//! logging, and cancellation integrate through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod estimators;
pub mod generator;
pub mod interfaces;
pub mod recovery;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use estimators::CauchyConfig;
pub use estimators::EstimatorSuite;
pub use estimators::SuiteConfig;
pub use generator::generate;
pub use interfaces::CancellationToken;
pub use interfaces::Estimator;
pub use interfaces::ExperimentLog;
pub use interfaces::ExperimentStore;
pub use interfaces::StoreError;
pub use interfaces::TrialRunner;
pub use recovery::KeyRecoveryData;
pub use recovery::KeyRecoveryReport;
pub use recovery::RecoveryError;
pub use recovery::recover_key;
pub use runtime::BisectionDriver;
pub use runtime::DriverError;
pub use runtime::InMemoryExperimentStore;
pub use runtime::SearchConfig;
pub use runtime::SearchOutcome;
pub use runtime::SuiteRunner;
pub use runtime::TrialTable;
pub use runtime::run_trial;
