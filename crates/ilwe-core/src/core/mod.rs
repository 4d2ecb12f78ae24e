// crates/ilwe-core/src/core/mod.rs
// ============================================================================
// Module: ILWE Core Types
// Description: Canonical parameter, instance, result, and record types.
// Purpose: Provide stable types shared by generator, estimators, and stores.
// Dependencies: nalgebra, serde
// ============================================================================

//! ## Overview
//! Core types describe what an experiment is about: identifying parameters,
//! generated instances, estimator results, persisted records, and log events.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod estimate;
pub mod events;
pub mod instance;
pub mod method;
pub mod params;
pub mod records;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use estimate::Estimate;
pub use estimate::EstimatorFailure;
pub use estimate::FailureKind;
pub use estimate::Solution;
pub use estimate::StopReason;
pub use estimate::TrialOutcome;
pub use estimate::round_to_integers;
pub use events::EstimatorEvent;
pub use events::SearchEvent;
pub use events::SearchStep;
pub use events::TrialEvent;
pub use instance::LinearSystem;
pub use instance::ProblemInstance;
pub use instance::SystemError;
pub use method::Method;
pub use method::MethodParseError;
pub use params::DEFAULT_DIMENSION;
pub use params::InstanceParams;
pub use params::ParameterFamily;
pub use params::SecurityLevel;
pub use params::SecurityLevelError;
pub use records::AggregateQuery;
pub use records::InstanceId;
pub use records::RunRecord;
pub use records::SampleAggregate;
pub use records::StoredInstance;
