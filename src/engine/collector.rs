use super::sources::{CollectedSample, MetricSource};
use crate::error::SourceError;
use crate::platform::health;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Result of polling one tracked metric in a cycle.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub metric: String,
    pub result: Result<CollectedSample, SourceError>,
}

impl PollOutcome {
    pub fn is_available(&self) -> bool {
        self.result.is_ok()
    }
}

struct Binding {
    metric: String,
    source: Arc<dyn MetricSource>,
}

/// Polls every configured source once per cycle.
///
/// Polls run concurrently and each is capped by `timeout`; the collector only
/// reads from the network; writing into the registry is left to the caller so
/// that no lock is held while requests are in flight.
pub struct MetricCollector {
    bindings: Vec<Binding>,
    timeout: Duration,
}

impl MetricCollector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            bindings: Vec::new(),
            timeout,
        }
    }

    pub fn bind(&mut self, metric: impl Into<String>, source: Arc<dyn MetricSource>) {
        self.bindings.push(Binding {
            metric: metric.into(),
            source,
        });
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.metric.as_str())
    }

    /// Poll the sources of every metric `include` accepts.
    ///
    /// Outcomes come back in binding order regardless of completion order.
    pub async fn collect<F>(&self, include: F) -> Vec<PollOutcome>
    where
        F: Fn(&str) -> bool,
    {
        let timeout = self.timeout;
        let polls = self
            .bindings
            .iter()
            .filter(|binding| include(&binding.metric))
            .map(|binding| async move {
                let result = match tokio::time::timeout(timeout, binding.source.poll()).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout {
                        metric: binding.metric.clone(),
                        after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }),
                };
                log_outcome(&binding.metric, binding.source.as_ref(), &result);
                PollOutcome {
                    metric: binding.metric.clone(),
                    result,
                }
            });

        join_all(polls).await
    }
}

fn log_outcome(
    metric: &str,
    source: &dyn MetricSource,
    result: &Result<CollectedSample, SourceError>,
) {
    let component = format!("source:{metric}");
    match result {
        Ok(sample) => {
            health::mark_component_ok(&component);
            tracing::debug!(metric, ?sample, "source polled");
        }
        Err(error) => {
            health::mark_component_error(&component, error);
            tracing::warn!(
                metric,
                endpoint = %source.describe(),
                %error,
                "source unavailable; checks skipped this cycle"
            );
        }
    }
}
