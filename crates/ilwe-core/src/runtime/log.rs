// crates/ilwe-core/src/runtime/log.rs
// ============================================================================
// Module: Experiment Log Sinks
// Description: JSON-lines sinks for estimator, trial, and search events.
// Purpose: Emit structured experiment logs without a logging framework.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every sink serialises events as one JSON object per line. The stderr sink
//! is the default for interactive runs, the file sink appends to a log file,
//! the null sink discards everything, and the memory sink keeps lines for
//! inspection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::EstimatorEvent;
use crate::core::SearchEvent;
use crate::core::TrialEvent;
use crate::interfaces::ExperimentLog;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Log sink that writes JSON lines to stderr.
pub struct StderrLog;

impl StderrLog {
    /// Writes one serialised event.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl ExperimentLog for StderrLog {
    fn record_estimator(&self, event: &EstimatorEvent) {
        Self::emit(event);
    }

    fn record_trial(&self, event: &TrialEvent) {
        Self::emit(event);
    }

    fn record_search(&self, event: &SearchEvent) {
        Self::emit(event);
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Log sink that appends JSON lines to a file.
pub struct FileLog {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLog {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialised event and flushes.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ExperimentLog for FileLog {
    fn record_estimator(&self, event: &EstimatorEvent) {
        self.emit(event);
    }

    fn record_trial(&self, event: &TrialEvent) {
        self.emit(event);
    }

    fn record_search(&self, event: &SearchEvent) {
        self.emit(event);
    }
}

// ============================================================================
// SECTION: Null Sink
// ============================================================================

/// Log sink that discards every event.
pub struct NullLog;

impl ExperimentLog for NullLog {
    fn record_estimator(&self, _event: &EstimatorEvent) {}
}

// ============================================================================
// SECTION: Memory Sink
// ============================================================================

/// Log sink that keeps JSON lines in memory.
#[derive(Default)]
pub struct MemoryLog {
    /// Captured lines in emission order.
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Captures one serialised event.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut lines) = self.lines.lock()
        {
            lines.push(payload);
        }
    }
}

impl ExperimentLog for MemoryLog {
    fn record_estimator(&self, event: &EstimatorEvent) {
        self.emit(event);
    }

    fn record_trial(&self, event: &TrialEvent) {
        self.emit(event);
    }

    fn record_search(&self, event: &SearchEvent) {
        self.emit(event);
    }
}
