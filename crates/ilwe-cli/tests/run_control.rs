// crates/ilwe-cli/tests/run_control.rs
// ============================================================================
// Module: Run Control Tests
// Description: Status-file token handling and minimal-sample reports.
// ============================================================================
//! ## Overview
//! Exercises the library half of the CLI without spawning the binary.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::time::Duration;

use ilwe_cli::control::StatusFile;
use ilwe_cli::logging::open_log;
use ilwe_cli::report::ThresholdCell;
use ilwe_cli::report::minimal_samples;
use ilwe_cli::report::render_report;
use ilwe_config::LogSink;
use ilwe_config::LoggingConfig;
use ilwe_core::CancellationToken;
use ilwe_core::EstimatorEvent;
use ilwe_core::ExperimentStore;
use ilwe_core::FailureKind;
use ilwe_core::InMemoryExperimentStore;
use ilwe_core::Method;
use ilwe_core::ParameterFamily;
use ilwe_core::RunRecord;
use ilwe_core::SearchConfig;
use tempfile::TempDir;

/// Small family used by the report tests.
const FAMILY: ParameterFamily = ParameterFamily {
    dimension: 16,
    eta: 1,
    tau: 4,
};

#[test]
fn status_file_runs_only_with_matching_token() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status");
    let status = StatusFile::new(&path, "run");
    assert!(status.should_stop(), "missing file stops the search");

    fs::write(&path, "run\n").unwrap();
    assert!(!status.should_stop());

    fs::write(&path, "  run  ").unwrap();
    assert!(!status.should_stop());

    fs::write(&path, "stop").unwrap();
    assert!(status.should_stop());

    fs::write(&path, "running").unwrap();
    assert!(status.should_stop());
    assert_eq!(status.path(), path.as_path());
}

#[test]
fn custom_token_is_honoured() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("status");
    fs::write(&path, "go").unwrap();
    assert!(!StatusFile::new(&path, "go").should_stop());
    assert!(StatusFile::new(&path, "run").should_stop());
}

#[test]
fn file_sink_appends_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let config = LoggingConfig {
        sink: LogSink::File,
        path: Some(path.clone()),
    };
    let log = open_log(&config).unwrap();
    log.record_estimator(&EstimatorEvent::failed(Method::Huber, FailureKind::Timeout, "budget", 3));
    drop(log);

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"method\":\"huber\""));
}

#[test]
fn file_sink_without_path_is_rejected() {
    let config = LoggingConfig {
        sink: LogSink::File,
        path: None,
    };
    assert!(open_log(&config).is_err());
}

#[test]
fn report_picks_smallest_complete_good_count() {
    let store = InMemoryExperimentStore::new();
    let config = SearchConfig {
        family: FAMILY,
        clip: 4.0,
        attempts: 2,
        success_threshold: 0.95,
        max_samples: 1_000,
        convergence_ratio: 1.01,
        lower_bound: 16,
    };
    // 40: one success of one attempt (incomplete); 48: two successes; 64: two successes.
    let trials = [(40, true), (48, true), (48, true), (64, true), (64, true), (32, false)];
    for (seed, (samples, solved)) in trials.into_iter().enumerate() {
        let params = FAMILY.instance(samples, 0.2, seed as u64);
        let (id, _) = store.get_or_create_instance(&params, 4.0).unwrap();
        store.record_run(&RunRecord::now(id, Method::L1, Duration::ZERO, solved)).unwrap();
    }

    let methods = [Method::L1, Method::Cauchy];
    let rates = [0.2];
    let cells = minimal_samples(&store, &config, &methods, &rates).unwrap();
    assert_eq!(
        cells,
        vec![
            ThresholdCell {
                method: Method::L1,
                contamination: 0.2,
                samples: Some(48),
            },
            ThresholdCell {
                method: Method::Cauchy,
                contamination: 0.2,
                samples: None,
            },
        ]
    );

    let rendered = render_report(&cells, &methods, &rates);
    assert!(rendered.contains("| p   | L1 | cauchy |"), "{rendered}");
    assert!(rendered.contains("| 0.2 | 48 | -      |"), "{rendered}");
}
