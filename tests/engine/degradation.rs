use std::collections::BTreeMap;
use std::sync::Arc;

use slawarden::SlaEngine;
use slawarden::store::InMemoryStateStore;
use tempfile::TempDir;

use crate::engine_harness::{
    FailingPublisher, FailingStore, collector, harness_with_store, scalar, scripted, test_config,
};

#[tokio::test]
async fn store_failure_does_not_abort_the_cycle() {
    let tmp = TempDir::new().unwrap();
    let h = harness_with_store(
        &test_config(tmp.path()),
        vec![("users", scripted(vec![scalar(25.0)]))],
        Arc::new(FailingStore),
    );

    assert_eq!(h.engine.load_persisted().await, 0);

    let report = h.engine.run_cycle().await;
    assert!(!report.persisted);
    assert!(report.published);
    assert_eq!(report.check("users_check"), Some(false));
    assert_eq!(report.violations.lifetime_count, 1);
    assert_eq!(h.publisher.events().len(), 1);
}

#[tokio::test]
async fn desired_update_survives_store_failure_in_memory() {
    let tmp = TempDir::new().unwrap();
    let h = harness_with_store(&test_config(tmp.path()), vec![], Arc::new(FailingStore));

    let outcome = h
        .engine
        .set_desired(&BTreeMap::from([("users_desired".to_string(), 42.0)]))
        .await;
    assert_eq!(outcome.applied, vec!["users_desired"]);
    assert_eq!(h.engine.status()["users_desired"], 42.0);
    assert!(h.engine.persisted_state().await.is_err());
}

#[tokio::test]
async fn publish_failure_does_not_abort_the_cycle() {
    let tmp = TempDir::new().unwrap();
    let engine = SlaEngine::with_parts(
        &test_config(tmp.path()),
        collector(vec![("users", scripted(vec![scalar(25.0), scalar(5.0)]))]),
        Arc::new(InMemoryStateStore::new()),
        Arc::new(FailingPublisher),
    );

    let first = engine.run_cycle().await;
    assert!(!first.published);
    assert!(first.persisted);

    let second = engine.run_cycle().await;
    assert!(!second.published);
    assert_eq!(second.check("users_check"), Some(true));
    assert_eq!(second.violations.lifetime_count, 1);
    assert_eq!(engine.cycles_run(), 2);

    let rows = engine.persisted_state().await.unwrap();
    let users = rows.iter().find(|row| row.name == "users_check").unwrap();
    assert_eq!(users.value, 1.0);
}
