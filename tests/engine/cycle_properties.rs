use std::sync::Arc;

use slawarden::engine::SkipReason;
use tempfile::TempDir;

use crate::engine_harness::{harness, labeled, scalar, scripted, test_config, unavailable};

#[tokio::test]
async fn users_over_desired_fails_requests_at_desired_passes() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![
            ("users", scripted(vec![scalar(25.0)])),
            ("requests", scripted(vec![scalar(12.0)])),
        ],
    );

    let report = h.engine.run_cycle().await;
    assert_eq!(report.check("users_check"), Some(false));
    assert_eq!(report.check("requests_check"), Some(true));
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.violations.lifetime_count, 1);
    assert_eq!(h.engine.violations().lifetime_count, 1);
}

#[tokio::test]
async fn lifetime_count_is_the_sum_of_per_cycle_failures() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    // failures per cycle: users, requests, cpu services
    //   1: 25>=20 fail, 13>12 fail, one of two services over -> 3
    //   2: pass, pass, no services                            -> 0
    //   3: fail, pass, both services over                     -> 3
    let h = harness(
        &config,
        vec![
            (
                "users",
                scripted(vec![scalar(25.0), scalar(5.0), scalar(20.0)]),
            ),
            (
                "requests",
                scripted(vec![scalar(13.0), scalar(12.0), scalar(1.0)]),
            ),
            (
                "cpu",
                scripted(vec![
                    labeled(&[("5000", 0.05), ("5002", 0.5)]),
                    labeled(&[]),
                    labeled(&[("5000", 0.2), ("5002", 0.3)]),
                ]),
            ),
        ],
    );

    let mut running = 0;
    let mut previous = 0;
    for expected in [3, 0, 3] {
        let report = h.engine.run_cycle().await;
        assert_eq!(report.failed_count, expected);
        running += expected;
        assert_eq!(report.violations.lifetime_count, running);
        assert!(report.violations.lifetime_count >= previous);
        previous = report.violations.lifetime_count;
    }
    assert_eq!(h.engine.cycles_run(), 3);
}

#[tokio::test]
async fn failing_source_only_skips_its_own_checks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![
            (
                "users",
                scripted(vec![scalar(10.0), scalar(30.0)]),
            ),
            (
                "requests",
                scripted(vec![scalar(50.0), unavailable("requests")]),
            ),
            ("cpu", scripted(vec![labeled(&[("5000", 0.01)])])),
        ],
    );

    let first = h.engine.run_cycle().await;
    assert_eq!(first.failed_count, 1);

    let second = h.engine.run_cycle().await;
    assert_eq!(second.check("requests_check"), None);
    assert_eq!(second.check("users_check"), Some(false));
    assert_eq!(second.check("cpu_check_5000"), Some(true));
    assert_eq!(second.failed_count, 1);
    assert_eq!(second.violations.lifetime_count, 2);
    assert!(
        second
            .skipped
            .iter()
            .any(|skip| skip.metric == "requests" && skip.reason == SkipReason::SourceUnavailable)
    );

    // previous value stays in place for reporting
    assert_eq!(h.engine.status()["requests"], 50.0);
}

#[tokio::test]
async fn labels_absent_this_cycle_produce_no_result() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![(
            "cpu",
            scripted(vec![
                labeled(&[("5000", 0.5), ("5002", 0.01)]),
                labeled(&[("5002", 0.01)]),
            ]),
        )],
    );

    let first = h.engine.run_cycle().await;
    assert_eq!(first.results.len(), 2);

    let second = h.engine.run_cycle().await;
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.check("cpu_check_5000"), None);
    assert_eq!(second.failed_count, 0);
}

#[tokio::test]
async fn each_cycle_publishes_one_event() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![
            ("users", scripted(vec![scalar(25.0)])),
            ("requests", scripted(vec![scalar(1.0)])),
        ],
    );

    h.engine.run_cycle().await;
    h.engine.run_cycle().await;

    let events = h.publisher.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].cycle, 2);
    assert_eq!(events[1].checks.get("users_check"), Some(&false));
    assert_eq!(events[1].checks.get("requests_check"), Some(&true));
    assert_eq!(events[1].failed_count, 1);
    assert_eq!(events[1].lifetime_count, 2);
    assert_ne!(events[0].event_id, events[1].event_id);
}

#[tokio::test]
async fn probability_tracks_last_cycle_failures() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![(
            "cpu",
            scripted(vec![
                labeled(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0), ("e", 1.0)]),
                labeled(&[("a", 0.0)]),
            ]),
        )],
    );

    let report = h.engine.run_cycle().await;
    assert_eq!(report.failed_count, 5);
    assert_eq!(h.engine.probability(2), 25.0);
    assert_eq!(h.engine.probability(0), 0.0);

    h.engine.run_cycle().await;
    assert_eq!(h.engine.probability(1), 0.0);
}

#[tokio::test]
async fn concurrent_cycles_never_overlap() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let h = harness(
        &config,
        vec![("users", scripted(vec![scalar(25.0)]))],
    );

    let runs: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&h.engine);
            tokio::spawn(async move { engine.run_cycle().await })
        })
        .collect();
    let mut cycles = Vec::new();
    for run in runs {
        cycles.push(run.await.unwrap().cycle);
    }
    cycles.sort_unstable();

    assert_eq!(cycles, (1..=8).collect::<Vec<_>>());
    assert_eq!(h.engine.violations().lifetime_count, 8);
}
