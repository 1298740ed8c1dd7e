use crate::config::Config;
use crate::engine::SlaEngine;
use crate::platform::health;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

mod evaluation_worker;
mod state;
mod supervisor;

use state::spawn_state_writer;
use supervisor::spawn_supervised_components;

const STATUS_FLUSH_SECONDS: u64 = 5;

/// Run the gateway and the evaluation timer until Ctrl-C.
///
/// On shutdown the timer stops scheduling cycles, an in-flight cycle gets
/// `evaluation.shutdown_grace_secs` to finish, then every task is aborted.
pub async fn run(config: Arc<Config>, host: String, port: u16) -> Result<()> {
    health::mark_component_ok("daemon");

    let engine = Arc::new(SlaEngine::bootstrap(&config).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles: Vec<JoinHandle<()>> = vec![spawn_state_writer(
        state_file_path(&config),
        Arc::clone(&engine),
    )];
    handles.extend(spawn_supervised_components(
        &engine,
        host.clone(),
        port,
        config.evaluation.interval_secs,
        &config.reliability,
        &shutdown_rx,
    ));

    println!("◆ slawarden daemon started");
    println!("   Gateway:  http://{host}:{port}");
    println!(
        "   Cycle:    every {}s, {} tracked metrics",
        config.evaluation.interval_secs,
        config.metrics.len()
    );
    println!("   Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    health::mark_component_error("daemon", "shutdown requested");
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(config.evaluation.shutdown_grace_secs);
    if engine.quiesce(grace).await {
        tracing::info!("evaluation idle; shutting down");
    } else {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "in-flight cycle did not finish in time; abandoning it"
        );
    }

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

pub fn state_file_path(config: &Config) -> PathBuf {
    state::state_file_path(config)
}
