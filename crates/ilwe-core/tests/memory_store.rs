// crates/ilwe-core/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Instance idempotence, run bookkeeping, and aggregates.
// ============================================================================
//! ## Overview
//! Validates the in-memory experiment store against the store contract.

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

use std::collections::BTreeSet;
use std::time::Duration;

use ilwe_core::AggregateQuery;
use ilwe_core::ExperimentStore;
use ilwe_core::InMemoryExperimentStore;
use ilwe_core::InstanceId;
use ilwe_core::Method;
use ilwe_core::ParameterFamily;
use ilwe_core::RunRecord;
use ilwe_core::StoreError;

/// Small family used by every test.
const FAMILY: ParameterFamily = ParameterFamily {
    dimension: 16,
    eta: 1,
    tau: 4,
};

#[test]
fn instance_lookup_is_idempotent() {
    let store = InMemoryExperimentStore::new();
    let params = FAMILY.instance(32, 0.1, 7);
    let (first, instance) = store.get_or_create_instance(&params, 4.0).unwrap();
    let (second, again) = store.get_or_create_instance(&params, 4.0).unwrap();
    assert_eq!(first, second);
    assert_eq!(instance, again);
    assert_eq!(store.find_instance(&params).unwrap().map(|stored| stored.id), Some(first));
    assert_eq!(store.error_count(first).unwrap(), Some(instance.error_count()));

    let other = store.get_or_create_instance(&FAMILY.instance(32, 0.1, 8), 4.0).unwrap().0;
    assert_ne!(first, other);
}

#[test]
fn lookup_under_a_different_clip_is_rejected() {
    let store = InMemoryExperimentStore::new();
    let params = FAMILY.instance(32, 0.1, 7);
    store.get_or_create_instance(&params, 4.0).unwrap();
    assert_eq!(store.find_instance(&params).unwrap().map(|stored| stored.clip), Some(4.0));

    let err = store.get_or_create_instance(&params, 3.0).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(ref detail) if detail.contains("clip 4")), "{err}");
    assert!(store.get_or_create_instance(&params, 4.0).is_ok());
}

#[test]
fn run_for_unknown_instance_is_rejected() {
    let store = InMemoryExperimentStore::new();
    let run = RunRecord::now(InstanceId::from_raw(42), Method::L2, Duration::ZERO, true);
    assert!(matches!(store.record_run(&run), Err(StoreError::Invalid(_))));
}

#[test]
fn completed_seeds_are_scoped_by_method_and_tuple() {
    let store = InMemoryExperimentStore::new();
    for seed in [0, 2, 5] {
        let (id, _) = store.get_or_create_instance(&FAMILY.instance(40, 0.2, seed), 4.0).unwrap();
        store.record_run(&RunRecord::now(id, Method::Huber, Duration::ZERO, seed != 2)).unwrap();
    }
    let seeds = store.completed_seeds(Method::Huber, &FAMILY, 40, 0.2).unwrap();
    assert_eq!(seeds, BTreeSet::from([0, 2, 5]));
    assert!(store.completed_seeds(Method::L1, &FAMILY, 40, 0.2).unwrap().is_empty());
    assert!(store.completed_seeds(Method::Huber, &FAMILY, 41, 0.2).unwrap().is_empty());
    assert!(store.completed_seeds(Method::Huber, &FAMILY, 40, 0.3).unwrap().is_empty());
}

#[test]
fn aggregates_are_ordered_by_rate_then_samples() {
    let store = InMemoryExperimentStore::new();
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
        store.query_aggregates(Method::Cauchy, &AggregateQuery::for_rate(FAMILY, 0.3)).unwrap();
    assert_eq!(filtered.len(), 2);
    assert!((filtered[1].success_rate() - 1.0).abs() < f64::EPSILON);
}
