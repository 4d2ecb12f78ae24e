// crates/ilwe-config/src/lib.rs
// ============================================================================
// Module: ILWE Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for ilwe.toml semantics.
// Dependencies: ilwe-core, ilwe-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `ilwe-config` defines the configuration model shared by every ILWE
//! command. Every field has a default, so an empty file is a valid
//! configuration; validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
