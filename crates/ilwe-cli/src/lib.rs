// crates/ilwe-cli/src/lib.rs
// ============================================================================
// Module: ILWE CLI Library
// Description: Shared helpers for the ILWE command-line interface.
// Purpose: Provide run control, log sinks, and reports for the binary and tests.
// Dependencies: ilwe-core, ilwe-config
// ============================================================================

//! ## Overview
//! This library houses the pieces of the `ilwe` binary that are worth testing
//! without spawning a process: the status-file stop signal, sink selection
//! for structured events, and the minimal-sample report.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod control;
pub mod logging;
pub mod report;
