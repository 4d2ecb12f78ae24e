// crates/ilwe-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Experiment Store
// Description: Durable ExperimentStore backend using SQLite WAL.
// Purpose: Persist instances and runs so searches resume after restarts.
// Dependencies: ilwe-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ilwe_core::ExperimentStore`]
//! holding the instance table, the static method registry, and the
//! append-only run log. Several search processes may share one database
//! file; WAL mode and a busy timeout serialise their commits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteExperimentStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
