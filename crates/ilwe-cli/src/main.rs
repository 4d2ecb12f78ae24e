// crates/ilwe-cli/src/main.rs
// ============================================================================
// Module: ILWE CLI Entry Point
// Description: Command dispatcher for ILWE experiments and key recovery.
// Purpose: Run single comparisons, resumable searches, reports, and recovery.
// Dependencies: clap, ilwe-core, ilwe-config, ilwe-store-sqlite, serde_json
// ============================================================================

//! ## Overview
//! `ilwe` wires the configuration, the `SQLite` store, the estimator suite,
//! and the bisection driver together. Results go to stdout; structured events
//! go to the configured log sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ilwe_cli::control::StatusFile;
use ilwe_cli::logging::open_log;
use ilwe_cli::report::minimal_samples;
use ilwe_cli::report::render_report;
use ilwe_config::IlweConfig;
use ilwe_core::BisectionDriver;
use ilwe_core::CancellationToken;
use ilwe_core::EstimatorSuite;
use ilwe_core::KeyRecoveryData;
use ilwe_core::Method;
use ilwe_core::SearchOutcome;
use ilwe_core::SuiteRunner;
use ilwe_core::generate;
use ilwe_core::recover_key;
use ilwe_core::recovery::recovery_config;
use ilwe_core::runtime::NeverCancel;
use ilwe_core::runtime::compare_methods;
use ilwe_store_sqlite::SqliteExperimentStore;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of key recovery attack data.
const MAX_RECOVERY_DATA_BYTES: usize = 256 * 1024 * 1024;
/// Maximum size of a prediction vector.
const MAX_PREDICTION_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "ilwe", version, about = "Concealed integer-LWE estimation toolkit")]
struct Cli {
    /// Optional config file path (defaults to ilwe.toml or `ILWE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every configured estimator on one instance.
    Solve(SolveCommand),
    /// Search minimal sample counts with resumable bisection.
    Search(SearchCommand),
    /// Report minimal sufficient sample counts from the store.
    Report(SweepArgs),
    /// Recover secret polynomials from attack measurements.
    Recover(RecoverCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `solve` command.
#[derive(Args, Debug)]
struct SolveCommand {
    /// Number of equations `m`.
    #[arg(long, default_value_t = 350)]
    samples: usize,
    /// Contamination rate `p`.
    #[arg(long, default_value_t = 0.1)]
    contamination: f64,
    /// PRNG seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Methods to run (defaults to `experiment.methods`).
    #[arg(long, value_delimiter = ',')]
    methods: Vec<Method>,
}

/// Method and rate overrides shared by sweeping commands.
#[derive(Args, Debug)]
struct SweepArgs {
    /// Methods to include (defaults to `experiment.methods`).
    #[arg(long, value_delimiter = ',')]
    methods: Vec<Method>,
    /// Contamination rates (defaults to `experiment.contamination_rates`).
    #[arg(long, value_delimiter = ',')]
    rates: Vec<f64>,
}

/// Arguments for the `search` command.
#[derive(Args, Debug)]
struct SearchCommand {
    /// Method and rate overrides.
    #[command(flatten)]
    sweep: SweepArgs,
}

/// Arguments for the `recover` command.
#[derive(Args, Debug)]
struct RecoverCommand {
    /// Attack data JSON (`s1`, `y`, `z`, `c`, `poly`, `coeff`, optional `bs`).
    #[arg(long, value_name = "PATH")]
    data: PathBuf,
    /// JSON array of 0/1 predictions, one per measurement.
    #[arg(long, value_name = "PATH")]
    predictions: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an ILWE configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = IlweConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    match cli.command {
        Commands::Solve(command) => command_solve(&config, &command),
        Commands::Search(command) => command_search(&config, &command.sweep),
        Commands::Report(command) => command_report(&config, &command),
        Commands::Recover(command) => command_recover(&config, &command),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => {
            write_stdout_line("config valid")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `solve` command.
fn command_solve(config: &IlweConfig, command: &SolveCommand) -> CliResult<ExitCode> {
    validate_rate(command.contamination)?;
    if command.samples == 0 {
        return Err(CliError::new("--samples must be positive".to_string()));
    }
    let log = open_log(&config.logging)
        .map_err(|err| CliError::new(format!("failed to open log sink: {err}")))?;
    let params = config.experiment.family().instance(command.samples, command.contamination, command.seed);
    let instance = generate(&params, config.experiment.clip());
    let suite = EstimatorSuite::new(&config.estimators.suite_config());
    let methods = pick_methods(&command.methods, &config.experiment.methods);

    write_stdout_line(&format!(
        "m={} n={} eta={} tau={} p={} seed={} errors={}",
        params.samples,
        params.dimension,
        params.eta,
        params.tau,
        params.contamination,
        params.seed,
        instance.error_count()
    ))?;
    let table = compare_methods(&suite, &methods, &instance, log.as_ref());
    write_stdout(&table.render())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `search` command.
fn command_search(config: &IlweConfig, sweep: &SweepArgs) -> CliResult<ExitCode> {
    let rates = pick_rates(&sweep.rates, &config.experiment.contamination_rates)?;
    let methods = pick_methods(&sweep.methods, &config.experiment.methods);
    let log = open_log(&config.logging)
        .map_err(|err| CliError::new(format!("failed to open log sink: {err}")))?;
    let store = open_store(config)?;
    let suite = EstimatorSuite::new(&config.estimators.suite_config());
    let runner = SuiteRunner::new(&suite, log.as_ref());
    let status = config
        .control
        .status_file
        .as_ref()
        .map(|path| StatusFile::new(path, config.control.run_token.as_str()));
    let cancel: &dyn CancellationToken = match &status {
        Some(status) => status,
        None => &NeverCancel,
    };
    let driver =
        BisectionDriver::new(config.experiment.search_config(), &store, &runner, cancel, log.as_ref());

    for &method in &methods {
        for &rate in &rates {
            let outcome = driver
                .search(method, rate)
                .map_err(|err| CliError::new(format!("search failed: {err}")))?;
            match outcome {
                SearchOutcome::Converged {
                    m_good,
                    m_bad,
                } => write_stdout_line(&format!("{method} p={rate}: m_good={m_good} m_bad={m_bad}"))?,
                SearchOutcome::NoUpperBound {
                    largest_tried,
                } => write_stdout_line(&format!(
                    "{method} p={rate}: no upper bound below {} (largest tried {})",
                    config.experiment.max_samples,
                    largest_tried.map_or_else(|| "none".to_string(), |m| m.to_string())
                ))?,
                SearchOutcome::Cancelled => {
                    write_stdout_line("search stopped by status file; rerun to resume")?;
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `report` command.
fn command_report(config: &IlweConfig, sweep: &SweepArgs) -> CliResult<ExitCode> {
    let rates = pick_rates(&sweep.rates, &config.experiment.contamination_rates)?;
    let methods = pick_methods(&sweep.methods, &config.experiment.methods);
    let store = open_store(config)?;
    let cells = minimal_samples(&store, &config.experiment.search_config(), &methods, &rates)
        .map_err(|err| CliError::new(format!("report failed: {err}")))?;
    write_stdout(&render_report(&cells, &methods, &rates))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `recover` command.
fn command_recover(config: &IlweConfig, command: &RecoverCommand) -> CliResult<ExitCode> {
    let data_bytes = read_bytes_with_limit(&command.data, MAX_RECOVERY_DATA_BYTES)?;
    let data: KeyRecoveryData = serde_json::from_slice(&data_bytes)
        .map_err(|err| CliError::new(format!("invalid attack data: {err}")))?;
    let prediction_bytes = read_bytes_with_limit(&command.predictions, MAX_PREDICTION_BYTES)?;
    let predictions: Vec<u8> = serde_json::from_slice(&prediction_bytes)
        .map_err(|err| CliError::new(format!("invalid predictions: {err}")))?;

    let report = recover_key(
        &data,
        &predictions,
        recovery_config(),
        config.estimators.suite_config().time_budget,
    )
    .map_err(|err| CliError::new(format!("key recovery failed: {err}")))?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?;
    write_stdout_line(&json)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the configured experiment store.
fn open_store(config: &IlweConfig) -> CliResult<SqliteExperimentStore> {
    SqliteExperimentStore::new(&config.store.sqlite_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Returns the override list or the configured default.
fn pick_methods(requested: &[Method], configured: &[Method]) -> Vec<Method> {
    if requested.is_empty() { configured.to_vec() } else { requested.to_vec() }
}

/// Returns validated override rates or the configured default.
fn pick_rates(requested: &[f64], configured: &[f64]) -> CliResult<Vec<f64>> {
    if requested.is_empty() {
        return Ok(configured.to_vec());
    }
    for &rate in requested {
        validate_rate(rate)?;
    }
    Ok(requested.to_vec())
}

/// Rejects rates outside `[0, 1)`.
fn validate_rate(rate: f64) -> CliResult<()> {
    if (0.0 .. 1.0).contains(&rate) {
        Ok(())
    } else {
        Err(CliError::new(format!("contamination rate {rate} must lie in [0, 1)")))
    }
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let io_error =
        |err: std::io::Error| CliError::new(format!("failed to read {}: {err}", path.display()));
    let file = File::open(path).map_err(io_error)?;
    let size = file.metadata().map_err(io_error)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(CliError::new(format!(
            "{} exceeds size limit ({size} > {max_bytes} bytes)",
            path.display()
        )));
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(io_error)?;
    if bytes.len() > max_bytes {
        return Err(CliError::new(format!("{} exceeds size limit", path.display())));
    }
    Ok(bytes)
}

/// Writes text to stdout without adding a newline.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    write!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
