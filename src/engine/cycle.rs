use super::aggregator::ViolationState;
use super::collector::PollOutcome;
use super::evaluator::{CheckResult, SkippedCheck};
use super::sources::CollectedSample;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedValue {
    pub metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<CollectedSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PollOutcome> for CollectedValue {
    fn from(outcome: &PollOutcome) -> Self {
        match &outcome.result {
            Ok(sample) => Self {
                metric: outcome.metric.clone(),
                sample: Some(sample.clone()),
                error: None,
            },
            Err(error) => Self {
                metric: outcome.metric.clone(),
                sample: None,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Report of one poll-evaluate-aggregate-publish run.
///
/// Built while the cycle runs and handed back to the caller; only the
/// registry, aggregator and store keep anything from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationCycle {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub uptime_secs: u64,
    pub collected: Vec<CollectedValue>,
    pub results: Vec<CheckResult>,
    pub skipped: Vec<SkippedCheck>,
    pub failed_count: u64,
    pub violations: ViolationState,
    /// Windows that latched during this cycle
    pub newly_latched: Vec<String>,
    /// Heuristic risk over the next minute
    pub probability: f64,
    pub persisted: bool,
    pub published: bool,
}

impl EvaluationCycle {
    pub fn check(&self, check_id: &str) -> Option<bool> {
        self.results
            .iter()
            .find(|result| result.check_id == check_id)
            .map(|result| result.passed)
    }
}
