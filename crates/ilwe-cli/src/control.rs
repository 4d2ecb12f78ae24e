// crates/ilwe-cli/src/control.rs
// ============================================================================
// Module: Run Control
// Description: Status-file backed stop signal for long searches.
// Purpose: Let operators pause a search by editing a file.
// Dependencies: ilwe-core
// ============================================================================

//! ## Overview
//! A search keeps running while its status file holds the run token. Any
//! other content, a missing file, or an unreadable file stops the search at
//! the next checkpoint; committed trials are kept and a later invocation
//! resumes from them.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use ilwe_core::CancellationToken;

/// Maximum number of status file bytes inspected.
const MAX_STATUS_BYTES: u64 = 4096;

/// Stop signal read from a status file before every trial.
#[derive(Debug, Clone)]
pub struct StatusFile {
    /// File consulted at each checkpoint.
    path: PathBuf,
    /// Trimmed content that keeps the search running.
    token: String,
}

impl StatusFile {
    /// Creates a status file signal.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            token: token.into(),
        }
    }

    /// Returns the watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true while the file holds the run token.
    #[must_use]
    pub fn is_running(&self) -> bool {
        let Ok(file) = File::open(&self.path) else {
            return false;
        };
        let mut content = String::new();
        if file.take(MAX_STATUS_BYTES).read_to_string(&mut content).is_err() {
            return false;
        }
        content.trim() == self.token
    }
}

impl CancellationToken for StatusFile {
    fn should_stop(&self) -> bool {
        !self.is_running()
    }
}
