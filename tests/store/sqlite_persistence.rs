use std::collections::BTreeMap;
use std::sync::Arc;

use slawarden::SlaEngine;
use slawarden::config::{Config, StoreBackend};
use slawarden::store::{SqliteStateStore, StateStore};
use tempfile::TempDir;

use crate::engine_harness::{
    harness_with_store, install_crypto_provider, labeled, scalar, scripted, test_config,
};

fn sqlite_config(tmp: &TempDir) -> Config {
    let mut config = test_config(tmp.path());
    config.store.backend = StoreBackend::Sqlite;
    config
}

#[tokio::test]
async fn desired_values_survive_a_restart() {
    install_crypto_provider();
    let tmp = TempDir::new().unwrap();
    let config = sqlite_config(&tmp);

    {
        let engine = SlaEngine::bootstrap(&config).await.unwrap();
        assert_eq!(engine.status()["users_desired"], 20.0);
        let outcome = engine
            .set_desired(&BTreeMap::from([
                ("users_desired".to_string(), 35.0),
                ("requests_desired".to_string(), 4.0),
            ]))
            .await;
        assert_eq!(outcome.applied.len(), 2);
    }

    assert!(
        config
            .store
            .resolve_path(&config.workspace_dir)
            .exists()
    );

    let restarted = SlaEngine::bootstrap(&config).await.unwrap();
    let status = restarted.status();
    assert_eq!(status["users_desired"], 35.0);
    assert_eq!(status["requests_desired"], 4.0);
    assert_eq!(status["cpu_desired"], 0.1);
}

#[tokio::test]
async fn cycle_results_are_written_as_one_batch() {
    let tmp = TempDir::new().unwrap();
    let config = sqlite_config(&tmp);
    let store = SqliteStateStore::open(&config.store.resolve_path(&config.workspace_dir))
        .await
        .unwrap();
    let store: Arc<dyn StateStore> = Arc::new(store);
    let h = harness_with_store(
        &config,
        vec![
            ("users", scripted(vec![scalar(25.0)])),
            ("requests", scripted(vec![scalar(3.0)])),
            ("cpu", scripted(vec![labeled(&[("5000", 0.04), ("5002", 0.3)])])),
        ],
        Arc::clone(&store),
    );

    let report = h.engine.run_cycle().await;
    assert!(report.persisted);

    let rows: BTreeMap<_, _> = store
        .load_all()
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row.name, row.value))
        .collect();
    assert_eq!(rows.get("users_check"), Some(&0.0));
    assert_eq!(rows.get("requests_check"), Some(&1.0));
    assert_eq!(rows.get("cpu_check_5000"), Some(&1.0));
    assert_eq!(rows.get("cpu_check_5002"), Some(&0.0));
}

#[tokio::test]
async fn persisted_rows_for_unknown_or_labeled_metrics_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::in_memory().await.unwrap());
    store.put("users_desired", 11.0).await.unwrap();
    store.put("cpu", 0.5).await.unwrap();
    store.put("retired_metric", 1.0).await.unwrap();

    let h = harness_with_store(&test_config(tmp.path()), vec![], store);
    assert_eq!(h.engine.load_persisted().await, 1);

    let status = h.engine.status();
    assert_eq!(status["users_desired"], 11.0);
    assert!(!status.contains_key("retired_metric"));
    assert!(!status.keys().any(|key| key.starts_with("cpu_") && key != "cpu_desired"));
}

#[tokio::test]
async fn unopenable_store_falls_back_to_memory() {
    install_crypto_provider();
    let tmp = TempDir::new().unwrap();
    let mut config = sqlite_config(&tmp);
    // a regular file where the database directory should be
    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();
    config.store.path = Some(blocker.join("sla_state.db"));

    let engine = SlaEngine::bootstrap(&config).await.unwrap();
    let outcome = engine
        .set_desired(&BTreeMap::from([("users_desired".to_string(), 9.0)]))
        .await;
    assert_eq!(outcome.applied, vec!["users_desired"]);
    assert_eq!(engine.persisted_state().await.unwrap().len(), 1);
}
