use crate::config::ReliabilityConfig;
use crate::engine::SlaEngine;
use crate::platform::health;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Run `run_component` forever, restarting it with exponential backoff.
///
/// A clean return counts as a failure too: supervised components are meant
/// to run until aborted. With `max_restarts > 0` the supervisor gives up
/// after that many consecutive failures.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!(component = name, "daemon component starting");
            match run_component().await {
                Ok(()) => {
                    tracing::warn!(component = name, "daemon component exited unexpectedly");
                    health::mark_component_error(name, "exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                }
                Err(e) => {
                    tracing::error!(component = name, error = %e, "daemon component failed");
                    health::mark_component_error(name, &e);
                }
            }
            consecutive_failures = consecutive_failures.saturating_add(1);

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    component = name,
                    max_restarts,
                    "daemon component exceeded max restarts, circuit open"
                );
                break;
            }
            health::bump_component_restart(name);
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

pub(super) fn spawn_supervised_components(
    engine: &Arc<SlaEngine>,
    host: String,
    port: u16,
    interval_secs: u64,
    reliability: &ReliabilityConfig,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let initial_backoff = reliability.component_initial_backoff_secs.max(1);
    let max_backoff = reliability.component_max_backoff_secs.max(initial_backoff);
    let max_restarts = reliability.component_max_restarts;

    let gateway_engine = Arc::clone(engine);
    let gateway = spawn_component_supervisor(
        "gateway",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let engine = Arc::clone(&gateway_engine);
            let host = host.clone();
            async move { crate::transport::gateway::run_gateway(&host, port, engine).await }
        },
    );

    let evaluator_engine = Arc::clone(engine);
    let evaluator_shutdown = shutdown.clone();
    let evaluator = spawn_component_supervisor(
        "evaluator",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let engine = Arc::clone(&evaluator_engine);
            let shutdown = evaluator_shutdown.clone();
            async move {
                super::evaluation_worker::run_evaluation_worker(engine, interval_secs, shutdown)
                    .await
            }
        },
    );

    vec![gateway, evaluator]
}
