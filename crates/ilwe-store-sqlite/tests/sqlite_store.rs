// crates/ilwe-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Persistence, schema guards, and resumable searches.
// ============================================================================
//! ## Overview
//! Exercises the `SQLite` experiment store against temporary databases,
//! including reopen cycles that model a restarted search process.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use ilwe_core::AggregateQuery;
use ilwe_core::BisectionDriver;
use ilwe_core::CancellationToken;
use ilwe_core::ExperimentStore;
use ilwe_core::InstanceId;
use ilwe_core::Method;
use ilwe_core::ParameterFamily;
use ilwe_core::ProblemInstance;
use ilwe_core::RunRecord;
use ilwe_core::SearchConfig;
use ilwe_core::SearchOutcome;
use ilwe_core::StoreError;
use ilwe_core::StoredInstance;
use ilwe_core::TrialOutcome;
use ilwe_core::TrialRunner;
use ilwe_core::runtime::NeverCancel;
use ilwe_core::runtime::NullLog;
use ilwe_store_sqlite::SqliteExperimentStore;
use ilwe_store_sqlite::SqliteStoreConfig;
use ilwe_store_sqlite::SqliteStoreError;
use ilwe_store_sqlite::SqliteStoreMode;
use ilwe_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

/// Small family so instance generation stays cheap.
const FAMILY: ParameterFamily = ParameterFamily {
    dimension: 16,
    eta: 1,
    tau: 4,
};

/// Opens a store at `path` with default pragmas.
fn open(path: &Path) -> SqliteExperimentStore {
    SqliteExperimentStore::new(&SqliteStoreConfig::at(path)).unwrap()
}

/// Runner that succeeds exactly when `m >= threshold`.
struct ThresholdRunner {
    /// Smallest sample count that succeeds.
    threshold: usize,
    /// Number of trials executed.
    calls: Cell<usize>,
}

impl TrialRunner for ThresholdRunner {
    fn run(&self, method: Method, instance: &ProblemInstance) -> TrialOutcome {
        self.calls.set(self.calls.get() + 1);
        TrialOutcome {
            method,
            estimate: None,
            elapsed: Duration::from_millis(2),
            success: instance.params().samples >= self.threshold,
            matching: 0,
        }
    }
}

/// Token that requests a stop after a fixed number of checks.
struct Countdown(Cell<usize>);

impl CancellationToken for Countdown {
    fn should_stop(&self) -> bool {
        let left = self.0.get();
        if left == 0 {
            return true;
        }
        self.0.set(left - 1);
        false
    }
}

/// Search configuration over the small family.
fn config() -> SearchConfig {
    SearchConfig {
        family: FAMILY,
        clip: 4.0,
        attempts: 10,
        success_threshold: 0.95,
        max_samples: 41_000,
        convergence_ratio: 1.01,
        lower_bound: 16,
    }
}

#[test]
fn instances_are_unique_per_tuple() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ilwe.db"));
    let params = FAMILY.instance(48, 0.25, 3);

    assert_eq!(store.find_instance(&params).unwrap(), None);
    let (first, instance) = store.get_or_create_instance(&params, 4.0).unwrap();
    let second = store.insert_instance(&params, instance.error_count(), 4.0).unwrap();
    assert_eq!(first, second.id);
    assert_eq!(
        store.find_instance(&params).unwrap(),
        Some(StoredInstance {
            id: first,
            clip: 4.0,
        })
    );
    assert_eq!(
        store.error_count(first).unwrap(),
        Some(u64::try_from(instance.error_count()).unwrap())
    );

    let other = store.insert_instance(&FAMILY.instance(48, 0.3, 3), 0, 4.0).unwrap();
    assert_ne!(first, other.id);
}

#[test]
fn clip_is_fixed_for_a_stored_instance() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ilwe.db");
    let params = FAMILY.instance(48, 0.25, 3);
    {
        let store = open(&path);
        store.get_or_create_instance(&params, 4.0).unwrap();
    }
    let store = open(&path);
    // Re-inserting under another clip keeps the original row.
    assert_eq!(store.insert_instance(&params, 0, 2.0).unwrap().clip, 4.0);
    let err = store.get_or_create_instance(&params, 2.0).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)), "{err}");
    assert!(store.get_or_create_instance(&params, 4.0).is_ok());
}

#[test]
fn runs_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("ilwe.db");
    {
        let store = open(&path);
        for seed in [0, 1, 4] {
            let (id, _) = store.get_or_create_instance(&FAMILY.instance(40, 0.1, seed), 4.0).unwrap();
            store.record_run(&RunRecord::now(id, Method::L1, Duration::from_millis(5), true)).unwrap();
        }
    }

    let store = open(&path);
    assert_eq!(store.run_count().unwrap(), 3);
    let seeds = store.completed_seeds(Method::L1, &FAMILY, 40, 0.1).unwrap();
    assert_eq!(seeds, BTreeSet::from([0, 1, 4]));
    assert!(store.completed_seeds(Method::Huber, &FAMILY, 40, 0.1).unwrap().is_empty());
}

#[test]
fn run_for_unknown_instance_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ilwe.db"));
    let run = RunRecord::now(InstanceId::from_raw(77), Method::L2, Duration::ZERO, false);
    assert!(matches!(store.record_run(&run), Err(StoreError::Store(_))));
}

#[test]
fn aggregates_group_by_rate_then_samples() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ilwe.db"));
    let cases = [(64, 0.3, true), (32, 0.3, false), (64, 0.1, true), (64, 0.1, false)];
    for (seed, (samples, rate, solved)) in cases.into_iter().enumerate() {
        let params = FAMILY.instance(samples, rate, seed as u64);
        let (id, _) = store.get_or_create_instance(&params, 4.0).unwrap();
        store.record_run(&RunRecord::now(id, Method::Cauchy, Duration::ZERO, solved)).unwrap();
    }

    let rows = store.query_aggregates(Method::Cauchy, &AggregateQuery::all(FAMILY)).unwrap();
    let keys: Vec<(f64, usize, u64, u64)> =
        rows.iter().map(|row| (row.contamination, row.samples, row.solved, row.attempts)).collect();
    assert_eq!(keys, vec![(0.1, 64, 1, 2), (0.3, 32, 0, 1), (0.3, 64, 1, 1)]);

    let filtered =
        store.query_aggregates(Method::Cauchy, &AggregateQuery::for_rate(FAMILY, 0.1)).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].failures(), 1);
    assert!(store.query_aggregates(Method::Ilp, &AggregateQuery::all(FAMILY)).unwrap().is_empty());
}

#[test]
fn schema_version_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ilwe.db");
    drop(open(&path));
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    }
    let err = SqliteExperimentStore::new(&SqliteStoreConfig::at(&path)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = SqliteExperimentStore::new(&SqliteStoreConfig::at(dir.path())).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn delete_journal_mode_opens() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        path: dir.path().join("legacy.db"),
        busy_timeout_ms: 100,
        journal_mode: SqliteStoreMode::Delete,
        sync_mode: SqliteSyncMode::Normal,
    };
    let store = SqliteExperimentStore::new(&config).unwrap();
    assert_eq!(store.run_count().unwrap(), 0);
}

#[test]
fn interrupted_search_resumes_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("search.db");

    let reference_dir = TempDir::new().unwrap();
    let reference_store = open(&reference_dir.path().join("reference.db"));
    let reference_runner = ThresholdRunner {
        threshold: 100,
        calls: Cell::new(0),
    };
    let expected = BisectionDriver::new(config(), &reference_store, &reference_runner, &NeverCancel, &NullLog)
        .search(Method::Cauchy, 0.5)
        .unwrap();
    assert_eq!(
        expected,
        SearchOutcome::Converged {
            m_good: 100,
            m_bad: 99,
        }
    );

    let runner = ThresholdRunner {
        threshold: 100,
        calls: Cell::new(0),
    };
    {
        let store = open(&path);
        let stop = Countdown(Cell::new(12));
        let outcome =
            BisectionDriver::new(config(), &store, &runner, &stop, &NullLog).search(Method::Cauchy, 0.5).unwrap();
        assert_eq!(outcome, SearchOutcome::Cancelled);
    }
    let store = open(&path);
    let outcome =
        BisectionDriver::new(config(), &store, &runner, &NeverCancel, &NullLog).search(Method::Cauchy, 0.5).unwrap();
    assert_eq!(outcome, expected);
    assert_eq!(runner.calls.get(), reference_runner.calls.get());
    assert_eq!(store.run_count().unwrap(), reference_store.run_count().unwrap());
}
