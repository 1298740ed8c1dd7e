use super::collector::PollOutcome;
use super::registry::MetricRegistry;
use super::sources::CollectedSample;
use crate::config::{ComparisonRule, TrackedMetricConfig};
use serde::Serialize;

/// One tracked quantity's comparison, fixed at configuration time.
#[derive(Debug, Clone)]
pub struct CheckSpec {
    pub metric: String,
    pub desired_name: String,
    pub rule: ComparisonRule,
}

impl From<&TrackedMetricConfig> for CheckSpec {
    fn from(metric: &TrackedMetricConfig) -> Self {
        Self {
            metric: metric.name.clone(),
            desired_name: metric.desired_name(),
            rule: metric.rule,
        }
    }
}

pub fn check_id(metric: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{metric}_check_{label}"),
        None => format!("{metric}_check"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub check_id: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SourceUnavailable,
    MetricRemoved,
    DesiredUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCheck {
    pub metric: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub results: Vec<CheckResult>,
    pub skipped: Vec<SkippedCheck>,
}

impl Evaluation {
    pub fn failed_count(&self) -> u64 {
        self.results.iter().filter(|result| !result.passed).count() as u64
    }
}

/// Compare this cycle's samples against the desired values in `registry`.
///
/// Only samples collected in this cycle are judged: a labeled metric yields
/// one result per label value present in its sample, and a metric whose
/// source was unavailable yields none. Deterministic and side-effect free.
pub fn evaluate(
    specs: &[CheckSpec],
    registry: &MetricRegistry,
    collected: &[PollOutcome],
) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for spec in specs {
        let skip = |reason| SkippedCheck {
            metric: spec.metric.clone(),
            reason,
        };

        if !registry.is_active(&spec.metric) {
            evaluation.skipped.push(skip(SkipReason::MetricRemoved));
            continue;
        }
        let Some(sample) = collected
            .iter()
            .find(|outcome| outcome.metric == spec.metric)
            .and_then(|outcome| outcome.result.as_ref().ok())
        else {
            evaluation.skipped.push(skip(SkipReason::SourceUnavailable));
            continue;
        };
        let Some(desired) = registry
            .get(&spec.desired_name)
            .ok()
            .and_then(|descriptor| descriptor.scalar_value())
        else {
            evaluation.skipped.push(skip(SkipReason::DesiredUnavailable));
            continue;
        };

        match sample {
            CollectedSample::Scalar(actual) => evaluation.results.push(CheckResult {
                check_id: check_id(&spec.metric, None),
                passed: spec.rule.passes(*actual, desired),
            }),
            CollectedSample::Labeled(series) => {
                evaluation
                    .results
                    .extend(series.iter().map(|(label, actual)| CheckResult {
                        check_id: check_id(&spec.metric, Some(label)),
                        passed: spec.rule.passes(*actual, desired),
                    }));
            }
        }
    }

    evaluation
}
