use crate::config::Config;
use crate::engine::{EvaluationCycle, SlaEngine, ViolationState};
use crate::platform::health::{self, HealthSnapshot};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Condensed view of the most recent cycle.
#[derive(Debug, Clone, Serialize)]
pub(super) struct CycleSummary {
    cycle: u64,
    started_at: String,
    failed_count: u64,
    skipped: usize,
    published: bool,
    persisted: bool,
}

impl From<&EvaluationCycle> for CycleSummary {
    fn from(report: &EvaluationCycle) -> Self {
        Self {
            cycle: report.cycle,
            started_at: report.started_at.to_rfc3339(),
            failed_count: report.failed_count,
            skipped: report.skipped.len(),
            published: report.published,
            persisted: report.persisted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct DaemonStatus {
    #[serde(flatten)]
    health: HealthSnapshot,
    last_cycle: Option<CycleSummary>,
    violations: ViolationState,
    written_at: String,
}

pub(super) fn state_file_path(config: &Config) -> PathBuf {
    config
        .config_path
        .parent()
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join("daemon_state.json")
}

pub(super) fn daemon_status(engine: &SlaEngine) -> DaemonStatus {
    DaemonStatus {
        health: health::snapshot(),
        last_cycle: engine.last_cycle().as_ref().map(CycleSummary::from),
        violations: engine.violations(),
        written_at: Utc::now().to_rfc3339(),
    }
}

async fn write_status(path: &Path, engine: &SlaEngine) {
    let data = serde_json::to_vec_pretty(&daemon_status(engine)).unwrap_or_else(|_| b"{}".to_vec());
    if let Err(error) = tokio::fs::write(path, data).await {
        tracing::warn!(%error, path = %path.display(), "failed to write daemon state file");
    }
}

pub(super) fn spawn_state_writer(path: PathBuf, engine: Arc<SlaEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(parent) = path.parent()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create state file directory");
        }

        let mut interval = tokio::time::interval(Duration::from_secs(super::STATUS_FLUSH_SECONDS));
        loop {
            interval.tick().await;
            write_status(&path, &engine).await;
        }
    })
}
