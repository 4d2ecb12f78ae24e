// crates/ilwe-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Experiment Store
// Description: Durable ExperimentStore backed by SQLite WAL.
// Purpose: Persist instance tuples and estimator runs across restarts.
// Dependencies: ilwe-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ExperimentStore`] using `SQLite`. The
//! schema has three relations plus a version guard:
//!
//! - `instance(id, m, n, eta, tau, p, seed, errors, clip)`, unique per tuple;
//!   `clip` records the bound the row was generated under
//! - `method(id, name)`, seeded from the method registry on open
//! - `run(id, instance_id, method_id, time, solved, timestamp)`, append-only
//! - `store_meta(version)`
//!
//! Every mutating call is a single transaction, so a crash never leaves a
//! half-recorded trial.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use ilwe_core::AggregateQuery;
use ilwe_core::ExperimentStore;
use ilwe_core::InstanceId;
use ilwe_core::InstanceParams;
use ilwe_core::Method;
use ilwe_core::ParameterFamily;
use ilwe_core::RunRecord;
use ilwe_core::SampleAggregate;
use ilwe_core::StoreError;
use ilwe_core::StoredInstance;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended for concurrent searches).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` experiment store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a configuration with default pragmas for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows violate the schema contract.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a `rusqlite` error to a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed experiment store with WAL support.
#[derive(Clone)]
pub struct SqliteExperimentStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteExperimentStore {
    /// Opens an `SQLite`-backed experiment store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the number of recorded runs.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn run_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 =
            guard.query_row("SELECT COUNT(*) FROM run", params![], |row| row.get(0)).map_err(db_error)?;
        to_u64(count, "run count")
    }

    /// Returns the number of contaminated equations recorded for an instance.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn error_count(&self, id: InstanceId) -> Result<Option<u64>, SqliteStoreError> {
        let guard = self.lock()?;
        let errors: Option<i64> = guard
            .query_row("SELECT errors FROM instance WHERE id = ?1", params![id.get()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_error)?;
        errors.map(|value| to_u64(value, "error count")).transpose()
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Looks up an instance handle by tuple.
    fn find(&self, params: &InstanceParams) -> Result<Option<StoredInstance>, SqliteStoreError> {
        let key = InstanceKey::from_params(params)?;
        let guard = self.lock()?;
        select_instance(&guard, &key)
    }

    /// Inserts an instance row unless the tuple exists.
    fn insert(
        &self,
        params: &InstanceParams,
        errors: usize,
        clip: f64,
    ) -> Result<StoredInstance, SqliteStoreError> {
        let key = InstanceKey::from_params(params)?;
        let errors = to_i64(errors, "error count")?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute(
            "INSERT INTO instance (m, n, eta, tau, p, seed, errors, clip) VALUES (?1, ?2, ?3, \
             ?4, ?5, ?6, ?7, ?8) ON CONFLICT (m, n, eta, tau, p, seed) DO NOTHING",
            params![
                key.samples,
                key.dimension,
                key.eta,
                key.tau,
                key.contamination,
                key.seed,
                errors,
                clip
            ],
        )
        .map_err(db_error)?;
        let stored = select_instance(&tx, &key)?.ok_or_else(|| {
            SqliteStoreError::Corrupt("instance row missing after insert".to_string())
        })?;
        tx.commit().map_err(db_error)?;
        Ok(stored)
    }

    /// Appends a run row.
    fn append_run(&self, run: &RunRecord) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO run (instance_id, method_id, time, solved, timestamp) VALUES (?1, \
                 ?2, ?3, ?4, ?5)",
                params![
                    run.instance_id.get(),
                    run.method.registry_id(),
                    run.elapsed.as_secs_f64(),
                    run.solved,
                    run.timestamp
                ],
            )
            .map_err(db_error)?;
        Ok(())
    }

    /// Returns recorded seeds for one `(method, m, p)` cell.
    fn seeds(
        &self,
        method: Method,
        family: &ParameterFamily,
        samples: usize,
        contamination: f64,
    ) -> Result<BTreeSet<u64>, SqliteStoreError> {
        let family = FamilyKey::from_family(family)?;
        let samples = to_i64(samples, "sample count")?;
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT DISTINCT i.seed FROM run r JOIN instance i ON i.id = r.instance_id WHERE \
                 r.method_id = ?1 AND i.n = ?2 AND i.eta = ?3 AND i.tau = ?4 AND i.m = ?5 AND \
                 i.p = ?6",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(
                params![
                    method.registry_id(),
                    family.dimension,
                    family.eta,
                    family.tau,
                    samples,
                    contamination
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(db_error)?;
        let mut seeds = BTreeSet::new();
        for seed in rows {
            seeds.insert(to_u64(seed.map_err(db_error)?, "seed")?);
        }
        Ok(seeds)
    }

    /// Returns grouped success counts.
    fn aggregates(
        &self,
        method: Method,
        query: &AggregateQuery,
    ) -> Result<Vec<SampleAggregate>, SqliteStoreError> {
        let family = FamilyKey::from_family(&query.family)?;
        let samples = query.samples.map(|value| to_i64(value, "sample count")).transpose()?;
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT i.m, i.p, SUM(r.solved), COUNT(*) FROM run r JOIN instance i ON i.id = \
                 r.instance_id WHERE r.method_id = ?1 AND i.n = ?2 AND i.eta = ?3 AND i.tau = ?4 \
                 AND (?5 IS NULL OR i.m = ?5) AND (?6 IS NULL OR i.p = ?6) GROUP BY i.p, i.m \
                 ORDER BY i.p, i.m",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(
                params![
                    method.registry_id(),
                    family.dimension,
                    family.eta,
                    family.tau,
                    samples,
                    query.contamination
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .map_err(db_error)?;
        let mut aggregates = Vec::new();
        for row in rows {
            let (samples, contamination, solved, attempts) = row.map_err(db_error)?;
            aggregates.push(SampleAggregate {
                samples: usize::try_from(samples).map_err(|_| {
                    SqliteStoreError::Corrupt(format!("negative sample count {samples}"))
                })?,
                contamination,
                solved: to_u64(solved, "solved count")?,
                attempts: to_u64(attempts, "attempt count")?,
            });
        }
        Ok(aggregates)
    }
}

impl ExperimentStore for SqliteExperimentStore {
    fn find_instance(
        &self,
        params: &InstanceParams,
    ) -> Result<Option<StoredInstance>, StoreError> {
        self.find(params).map_err(StoreError::from)
    }

    fn insert_instance(
        &self,
        params: &InstanceParams,
        errors: usize,
        clip: f64,
    ) -> Result<StoredInstance, StoreError> {
        self.insert(params, errors, clip).map_err(StoreError::from)
    }

    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        self.append_run(run).map_err(StoreError::from)
    }

    fn completed_seeds(
        &self,
        method: Method,
        family: &ParameterFamily,
        samples: usize,
        contamination: f64,
    ) -> Result<BTreeSet<u64>, StoreError> {
        self.seeds(method, family, samples, contamination).map_err(StoreError::from)
    }

    fn query_aggregates(
        &self,
        method: Method,
        query: &AggregateQuery,
    ) -> Result<Vec<SampleAggregate>, StoreError> {
        self.aggregates(method, query).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Row Keys
// ============================================================================//

/// Structural columns converted to `SQLite` integers.
struct FamilyKey {
    /// Secret dimension.
    dimension: i64,
    /// Secret coefficient half-width.
    eta: i64,
    /// Nonzeros per row.
    tau: i64,
}

impl FamilyKey {
    /// Converts a parameter family.
    fn from_family(family: &ParameterFamily) -> Result<Self, SqliteStoreError> {
        Ok(Self {
            dimension: to_i64(family.dimension, "dimension")?,
            eta: family.eta,
            tau: to_i64(family.tau, "tau")?,
        })
    }
}

/// Identifying tuple converted to `SQLite` values.
struct InstanceKey {
    /// Number of equations.
    samples: i64,
    /// Secret dimension.
    dimension: i64,
    /// Secret coefficient half-width.
    eta: i64,
    /// Nonzeros per row.
    tau: i64,
    /// Contamination rate.
    contamination: f64,
    /// PRNG seed.
    seed: i64,
}

impl InstanceKey {
    /// Converts an instance tuple.
    fn from_params(params: &InstanceParams) -> Result<Self, SqliteStoreError> {
        let family = FamilyKey::from_family(&params.family())?;
        Ok(Self {
            samples: to_i64(params.samples, "sample count")?,
            dimension: family.dimension,
            eta: family.eta,
            tau: family.tau,
            contamination: params.contamination,
            seed: i64::try_from(params.seed).map_err(|_| {
                SqliteStoreError::Invalid(format!("seed {} exceeds storage range", params.seed))
            })?,
        })
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Selects the handle of an instance tuple.
fn select_instance(
    connection: &Connection,
    key: &InstanceKey,
) -> Result<Option<StoredInstance>, SqliteStoreError> {
    connection
        .query_row(
            "SELECT id, clip FROM instance WHERE m = ?1 AND n = ?2 AND eta = ?3 AND tau = ?4 AND \
             p = ?5 AND seed = ?6",
            params![key.samples, key.dimension, key.eta, key.tau, key.contamination, key.seed],
            |row| {
                Ok(StoredInstance {
                    id: InstanceId::from_raw(row.get(0)?),
                    clip: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_error)
}

/// Converts a count to a `SQLite` integer.
fn to_i64(value: usize, label: &str) -> Result<i64, SqliteStoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("{label} {value} exceeds storage range")))
}

/// Converts a stored integer to an unsigned count.
fn to_u64(value: i64, label: &str) -> Result<u64, SqliteStoreError> {
    u64::try_from(value).map_err(|_| SqliteStoreError::Corrupt(format!("negative {label} {value}")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and shared access.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS method (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                );
                CREATE TABLE IF NOT EXISTS instance (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    m INTEGER NOT NULL,
                    n INTEGER NOT NULL,
                    eta INTEGER NOT NULL,
                    tau INTEGER NOT NULL,
                    p REAL NOT NULL,
                    seed INTEGER NOT NULL,
                    errors INTEGER NOT NULL,
                    clip REAL NOT NULL,
                    UNIQUE (m, n, eta, tau, p, seed)
                );
                CREATE TABLE IF NOT EXISTS run (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    instance_id INTEGER NOT NULL,
                    method_id INTEGER NOT NULL,
                    time REAL NOT NULL,
                    solved INTEGER NOT NULL,
                    timestamp INTEGER NOT NULL,
                    FOREIGN KEY (instance_id) REFERENCES instance(id),
                    FOREIGN KEY (method_id) REFERENCES method(id)
                );
                CREATE INDEX IF NOT EXISTS idx_run_method_instance
                    ON run (method_id, instance_id);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    for method in Method::ALL {
        tx.execute(
            "INSERT INTO method (id, name) VALUES (?1, ?2) ON CONFLICT (id) DO NOTHING",
            params![method.registry_id(), method.as_str()],
        )
        .map_err(db_error)?;
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
