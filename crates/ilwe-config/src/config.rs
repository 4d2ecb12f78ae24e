// crates/ilwe-config/src/config.rs
// ============================================================================
// Module: ILWE Configuration
// Description: Configuration loading and validation for ILWE experiments.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ilwe-core, ilwe-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `ILWE_CONFIG`, then `ilwe.toml` in
//! the working directory. Sections map one-to-one onto the immutable values
//! consumed by the estimator suite, the bisection driver, and the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ilwe_core::CauchyConfig;
use ilwe_core::DEFAULT_DIMENSION;
use ilwe_core::Method;
use ilwe_core::ParameterFamily;
use ilwe_core::SearchConfig;
use ilwe_core::SecurityLevel;
use ilwe_core::SuiteConfig;
use ilwe_core::runtime::DEFAULT_ATTEMPTS;
use ilwe_core::runtime::DEFAULT_CONVERGENCE_RATIO;
use ilwe_core::runtime::DEFAULT_MAX_SAMPLES;
use ilwe_core::runtime::DEFAULT_SUCCESS_THRESHOLD;
use ilwe_store_sqlite::SqliteStoreConfig;
use ilwe_store_sqlite::SqliteStoreMode;
use ilwe_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ilwe.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ILWE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-trial solver budget in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 120_000;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default database filename.
const DEFAULT_STORE_PATH: &str = "ilwe.db";
/// Default token the status file must contain for searches to continue.
const DEFAULT_RUN_TOKEN: &str = "run";
/// Contamination rates swept by default.
const DEFAULT_CONTAMINATION_RATES: [f64; 19] = [
    0.01, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8,
    0.85, 0.9,
];

// ============================================================================
// SECTION: Root
// ============================================================================

/// Root configuration for ILWE commands.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IlweConfig {
    /// Instance family and search parameters.
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Estimator tuning.
    #[serde(default)]
    pub estimators: EstimatorsConfig,
    /// Experiment store location and pragmas.
    #[serde(default)]
    pub store: StoreConfig,
    /// Structured event sink.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// External run control.
    #[serde(default)]
    pub control: ControlConfig,
}

impl IlweConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.experiment.validate()?;
        self.estimators.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        self.control.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Experiment
// ============================================================================

/// Instance family and bisection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    /// NIST security level selecting `(eta, tau)`.
    #[serde(default)]
    pub level: SecurityLevel,
    /// Secret dimension `n`.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Trials per sample count.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Success rate a sample count must reach.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,
    /// Growth ceiling for the bisection driver.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// `m_good / m_bad` ratio at which bisection stops.
    #[serde(default = "default_convergence_ratio")]
    pub convergence_ratio: f64,
    /// Assumed bad sample count; defaults to the dimension.
    #[serde(default)]
    pub lower_bound: Option<usize>,
    /// Observation bound; defaults to `tau`.
    #[serde(default)]
    pub clip: Option<f64>,
    /// Contamination rates swept by `ilwe search`.
    #[serde(default = "default_contamination_rates")]
    pub contamination_rates: Vec<f64>,
    /// Methods run by `ilwe solve` and `ilwe search`.
    #[serde(default = "default_methods")]
    pub methods: Vec<Method>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            level: SecurityLevel::default(),
            dimension: default_dimension(),
            attempts: default_attempts(),
            success_threshold: default_success_threshold(),
            max_samples: default_max_samples(),
            convergence_ratio: default_convergence_ratio(),
            lower_bound: None,
            clip: None,
            contamination_rates: default_contamination_rates(),
            methods: default_methods(),
        }
    }
}

impl ExperimentConfig {
    /// Returns the structural parameters of every generated instance.
    #[must_use]
    pub const fn family(&self) -> ParameterFamily {
        self.level.family(self.dimension)
    }

    /// Returns the effective observation bound.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "tau is a small row weight.")]
    pub fn clip(&self) -> f64 {
        self.clip.unwrap_or(self.level.tau() as f64)
    }

    /// Returns the immutable search configuration.
    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            family: self.family(),
            clip: self.clip(),
            attempts: self.attempts,
            success_threshold: self.success_threshold,
            max_samples: self.max_samples,
            convergence_ratio: self.convergence_ratio,
            lower_bound: self.lower_bound.unwrap_or(self.dimension),
        }
    }

    /// Validates experiment parameters.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::Invalid("experiment.dimension must be positive".to_string()));
        }
        if self.attempts == 0 {
            return Err(ConfigError::Invalid("experiment.attempts must be positive".to_string()));
        }
        if !(self.success_threshold > 0.0 && self.success_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "experiment.success_threshold must lie in (0, 1]".to_string(),
            ));
        }
        if !(self.convergence_ratio.is_finite() && self.convergence_ratio > 1.0) {
            return Err(ConfigError::Invalid(
                "experiment.convergence_ratio must be greater than 1".to_string(),
            ));
        }
        let lower_bound = self.lower_bound.unwrap_or(self.dimension);
        if self.max_samples <= lower_bound {
            return Err(ConfigError::Invalid(
                "experiment.max_samples must exceed experiment.lower_bound".to_string(),
            ));
        }
        let clip = self.clip();
        if !(clip.is_finite() && clip > 0.0) {
            return Err(ConfigError::Invalid("experiment.clip must be positive".to_string()));
        }
        if self.contamination_rates.is_empty() {
            return Err(ConfigError::Invalid(
                "experiment.contamination_rates must be non-empty".to_string(),
            ));
        }
        if let Some(rate) =
            self.contamination_rates.iter().find(|rate| !(**rate >= 0.0 && **rate < 1.0))
        {
            return Err(ConfigError::Invalid(format!(
                "experiment.contamination_rates entry {rate} must lie in [0, 1)"
            )));
        }
        if self.methods.is_empty() {
            return Err(ConfigError::Invalid("experiment.methods must be non-empty".to_string()));
        }
        for (index, method) in self.methods.iter().enumerate() {
            if self.methods[.. index].contains(method) {
                return Err(ConfigError::Invalid(format!(
                    "experiment.methods lists {method} twice"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Estimators
// ============================================================================

/// Estimator tuning shared by every trial.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EstimatorsConfig {
    /// Per-trial wall-clock budget in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Huber threshold `M`.
    #[serde(default = "default_huber_threshold")]
    pub huber_threshold: f64,
    /// ILP big-M override; defaults to `n * eta`.
    #[serde(default)]
    pub big_m: Option<f64>,
    /// Cauchy IRLS knobs.
    #[serde(default)]
    pub cauchy: CauchyConfig,
}

impl Default for EstimatorsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            huber_threshold: default_huber_threshold(),
            big_m: None,
            cauchy: CauchyConfig::default(),
        }
    }
}

impl EstimatorsConfig {
    /// Returns the immutable estimator suite configuration.
    #[must_use]
    pub const fn suite_config(&self) -> SuiteConfig {
        SuiteConfig {
            time_budget: Duration::from_millis(self.timeout_ms),
            huber_threshold: self.huber_threshold,
            cauchy: self.cauchy,
            big_m: self.big_m,
        }
    }

    /// Validates estimator tuning.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("estimators.timeout_ms must be positive".to_string()));
        }
        if !(self.huber_threshold.is_finite() && self.huber_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "estimators.huber_threshold must be positive".to_string(),
            ));
        }
        if let Some(big_m) = self.big_m
            && !(big_m.is_finite() && big_m > 0.0)
        {
            return Err(ConfigError::Invalid("estimators.big_m must be positive".to_string()));
        }
        let cauchy = &self.cauchy;
        if !(cauchy.convergence_eps.is_finite() && cauchy.convergence_eps > 0.0) {
            return Err(ConfigError::Invalid(
                "estimators.cauchy.convergence_eps must be positive".to_string(),
            ));
        }
        if cauchy.convergence_min_run == 0 {
            return Err(ConfigError::Invalid(
                "estimators.cauchy.convergence_min_run must be positive".to_string(),
            ));
        }
        if cauchy.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "estimators.cauchy.max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Experiment store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        validate_path(&self.path)
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Destination of structured experiment events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Events are discarded.
    None,
}

/// Structured logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Event sink.
    #[serde(default)]
    pub sink: LogSink,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("file logging sink requires logging.path".to_string()))
            }
            (LogSink::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())?;
                validate_path(path)
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid with the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Control
// ============================================================================

/// External run control for long searches.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Status file consulted before every trial.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
    /// Content the status file must hold for the search to continue.
    #[serde(default = "default_run_token")]
    pub run_token: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            status_file: None,
            run_token: default_run_token(),
        }
    }
}

impl ControlConfig {
    /// Validates run control configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.run_token.trim().is_empty() {
            return Err(ConfigError::Invalid("control.run_token must be non-empty".to_string()));
        }
        if self.run_token.trim() != self.run_token {
            return Err(ConfigError::Invalid(
                "control.run_token must not carry surrounding whitespace".to_string(),
            ));
        }
        if let Some(path) = &self.status_file {
            validate_path_string("control.status_file", &path.to_string_lossy())?;
            validate_path(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates that a path field is non-empty.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Default secret dimension.
const fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

/// Default trials per sample count.
const fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

/// Default success threshold.
const fn default_success_threshold() -> f64 {
    DEFAULT_SUCCESS_THRESHOLD
}

/// Default growth ceiling.
const fn default_max_samples() -> usize {
    DEFAULT_MAX_SAMPLES
}

/// Default bisection stopping ratio.
const fn default_convergence_ratio() -> f64 {
    DEFAULT_CONVERGENCE_RATIO
}

/// Default contamination sweep.
fn default_contamination_rates() -> Vec<f64> {
    DEFAULT_CONTAMINATION_RATES.to_vec()
}

/// Default method list.
fn default_methods() -> Vec<Method> {
    Method::ALL.to_vec()
}

/// Default per-trial budget.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default Huber threshold.
const fn default_huber_threshold() -> f64 {
    ilwe_core::estimators::DEFAULT_HUBER_THRESHOLD
}

/// Default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Default run token.
fn default_run_token() -> String {
    DEFAULT_RUN_TOKEN.to_string()
}
