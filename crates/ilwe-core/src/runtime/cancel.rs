// crates/ilwe-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cancellation Tokens
// Description: In-process implementations of the driver stop signal.
// Purpose: Let callers stop a search between trials.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`NeverCancel`] runs searches to completion; [`CancellationFlag`] is a
//! shareable flag another thread can raise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::interfaces::CancellationToken;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Token that never requests a stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Shareable stop flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    /// Raised once a stop was requested.
    raised: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop at the next checkpoint.
    pub fn cancel(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}

impl CancellationToken for CancellationFlag {
    fn should_stop(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
