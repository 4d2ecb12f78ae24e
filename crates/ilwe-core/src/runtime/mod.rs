// crates/ilwe-core/src/runtime/mod.rs
// ============================================================================
// Module: ILWE Runtime
// Description: Trial harness, bisection driver, and in-process backends.
// Purpose: Execute experiments against the interfaces.
// Dependencies: crate::{core, estimators, interfaces}
// ============================================================================

//! ## Overview
//! The runtime executes trials and searches. It depends only on the
//! interfaces, so durable stores and log pipelines plug in from other crates.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod bisection;
pub mod cancel;
pub mod harness;
pub mod log;
pub mod store;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bisection::BisectionDriver;
pub use bisection::DEFAULT_ATTEMPTS;
pub use bisection::DEFAULT_CONVERGENCE_RATIO;
pub use bisection::DEFAULT_MAX_SAMPLES;
pub use bisection::DEFAULT_SUCCESS_THRESHOLD;
pub use bisection::DriverError;
pub use bisection::SearchConfig;
pub use bisection::SearchOutcome;
pub use cancel::CancellationFlag;
pub use cancel::NeverCancel;
pub use harness::SuiteRunner;
pub use harness::TrialTable;
pub use harness::compare_methods;
pub use harness::run_trial;
pub use log::FileLog;
pub use log::MemoryLog;
pub use log::NullLog;
pub use log::StderrLog;
pub use store::InMemoryExperimentStore;
pub use table::render_grid;
