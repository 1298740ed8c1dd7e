use crate::engine::SlaEngine;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior};

/// Drive one evaluation cycle per tick until shutdown is signalled.
///
/// The loop awaits each cycle before waiting for the next tick, so cycles
/// never overlap; ticks missed while a slow cycle runs are skipped.
pub(super) async fn run_evaluation_worker(
    engine: Arc<SlaEngine>,
    interval_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("evaluation worker stopping");
                    return Ok(());
                }
                continue;
            }
        }
        if *shutdown.borrow() {
            return Ok(());
        }

        let report = engine.run_cycle().await;
        tracing::debug!(cycle = report.cycle, failed = report.failed_count, "tick evaluated");
    }
}
