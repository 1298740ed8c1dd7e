//! Metric sources polled once per evaluation cycle.
//!
//! Two wire formats are supported:
//! - text endpoints answering `name value` lines (comments skipped)
//! - the Prometheus HTTP API instant-query JSON, one series per service

use crate::config::SourceConfig;
use crate::error::SourceError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// One successful poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectedSample {
    Scalar(f64),
    /// label value -> observed value, only the series present in this poll
    Labeled(BTreeMap<String, f64>),
}

pub type PollFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CollectedSample, SourceError>> + Send + 'a>>;

pub trait MetricSource: Send + Sync {
    /// Human-readable endpoint description for logs.
    fn describe(&self) -> String;

    fn poll(&self) -> PollFuture<'_>;
}

pub fn build_source_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub fn create_source(
    metric: &str,
    config: &SourceConfig,
    client: Client,
    timeout: Duration,
) -> Arc<dyn MetricSource> {
    let budget_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    match config {
        SourceConfig::Scalar { url, sample } => Arc::new(ScalarHttpSource {
            metric: metric.to_string(),
            url: url.clone(),
            sample: sample.clone(),
            budget_ms,
            client,
        }),
        SourceConfig::PrometheusQuery {
            base_url,
            query,
            label_key,
        } => Arc::new(PrometheusQuerySource {
            metric: metric.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            query: query.clone(),
            label_key: label_key.clone(),
            budget_ms,
            client,
        }),
    }
}

fn request_error(metric: &str, budget_ms: u64, error: &reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout {
            metric: metric.to_string(),
            after_ms: budget_ms,
        }
    } else {
        SourceError::Request {
            metric: metric.to_string(),
            message: error.to_string(),
        }
    }
}

fn malformed(metric: &str, message: impl Into<String>) -> SourceError {
    SourceError::Malformed {
        metric: metric.to_string(),
        message: message.into(),
    }
}

async fn fetch_text(
    request: reqwest::RequestBuilder,
    metric: &str,
    budget_ms: u64,
) -> Result<String, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| request_error(metric, budget_ms, &e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            metric: metric.to_string(),
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| request_error(metric, budget_ms, &e))
}

// ── Scalar text source ───────────────────────────────────────────────────────

pub struct ScalarHttpSource {
    metric: String,
    url: String,
    sample: Option<String>,
    budget_ms: u64,
    client: Client,
}

impl MetricSource for ScalarHttpSource {
    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }

    fn poll(&self) -> PollFuture<'_> {
        Box::pin(async move {
            let body =
                fetch_text(self.client.get(&self.url), &self.metric, self.budget_ms).await?;
            parse_scalar_payload(&body, self.sample.as_deref())
                .map(CollectedSample::Scalar)
                .map_err(|message| malformed(&self.metric, message))
        })
    }
}

/// Extract one value from a `name value` text payload.
///
/// Comment lines are skipped. With `sample` set, the line whose name matches
/// it (case-insensitively, labels ignored) wins; otherwise the first sample
/// line is used.
pub fn parse_scalar_payload(body: &str, sample: Option<&str>) -> Result<f64, String> {
    let mut lines = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let line = match sample {
        Some(wanted) => lines.find(|line| {
            line.split_whitespace().next().is_some_and(|name| {
                let bare = name.split('{').next().unwrap_or(name);
                bare.eq_ignore_ascii_case(wanted)
            })
        }),
        None => lines.next(),
    }
    .ok_or_else(|| match sample {
        Some(wanted) => format!("no sample named '{wanted}'"),
        None => "no sample lines".to_string(),
    })?;

    let raw = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| format!("sample line '{line}' has no value"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("value '{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("value '{raw}' is not finite"));
    }
    Ok(value)
}

// ── Prometheus instant-query source ──────────────────────────────────────────

pub struct PrometheusQuerySource {
    metric: String,
    base_url: String,
    query: String,
    label_key: String,
    budget_ms: u64,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QuerySeries>,
}

#[derive(Debug, Deserialize)]
struct QuerySeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    /// `[unix_ts, "value"]`
    value: (serde_json::Value, String),
}

impl MetricSource for PrometheusQuerySource {
    fn describe(&self) -> String {
        format!("GET {}/api/v1/query?query={}", self.base_url, self.query)
    }

    fn poll(&self) -> PollFuture<'_> {
        Box::pin(async move {
            let url = format!("{}/api/v1/query", self.base_url);
            let request = self.client.get(&url).query(&[("query", self.query.as_str())]);
            let body = fetch_text(request, &self.metric, self.budget_ms).await?;
            parse_query_payload(&body, &self.label_key, &self.metric)
                .map(CollectedSample::Labeled)
                .map_err(|message| malformed(&self.metric, message))
        })
    }
}

/// Turn an instant-query vector into `label value -> value`.
///
/// Series without `label_key` or with an unparsable value are skipped.
pub fn parse_query_payload(
    body: &str,
    label_key: &str,
    metric: &str,
) -> Result<BTreeMap<String, f64>, String> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid query response: {e}"))?;
    if response.status != "success" {
        return Err(format!(
            "query status '{}': {}",
            response.status,
            response.error.unwrap_or_default()
        ));
    }

    let mut series = BTreeMap::new();
    for item in response.data.map(|d| d.result).unwrap_or_default() {
        let Some(label) = item.metric.get(label_key) else {
            tracing::warn!(metric, label_key, "query series missing label; skipped");
            continue;
        };
        match item.value.1.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                series.insert(label.clone(), value);
            }
            _ => {
                tracing::warn!(metric, label = %label, raw = %item.value.1, "unparsable series value; skipped");
            }
        }
    }
    Ok(series)
}
