// crates/ilwe-cli/src/logging.rs
// ============================================================================
// Module: Log Sink Selection
// Description: Builds the configured structured event sink.
// Purpose: Map the logging config section onto ExperimentLog backends.
// Dependencies: ilwe-core, ilwe-config
// ============================================================================

//! ## Overview
//! Commands receive one boxed [`ExperimentLog`]; the sink is chosen once
//! from `[logging]` and shared by every trial and search step.

use std::io;

use ilwe_config::LogSink;
use ilwe_config::LoggingConfig;
use ilwe_core::ExperimentLog;
use ilwe_core::runtime::FileLog;
use ilwe_core::runtime::NullLog;
use ilwe_core::runtime::StderrLog;

/// Opens the configured event sink.
///
/// # Errors
///
/// Returns an I/O error when the file sink cannot be opened.
pub fn open_log(config: &LoggingConfig) -> io::Result<Box<dyn ExperimentLog>> {
    match config.sink {
        LogSink::Stderr => Ok(Box::new(StderrLog)),
        LogSink::None => Ok(Box::new(NullLog)),
        LogSink::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "file sink requires logging.path")
            })?;
            Ok(Box::new(FileLog::new(path)?))
        }
    }
}
