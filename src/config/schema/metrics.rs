use serde::{Deserialize, Serialize};

/// How an observed value is compared against its desired value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonRule {
    /// `actual < desired`
    Below,
    /// `actual <= desired`
    AtMost,
}

impl ComparisonRule {
    pub fn passes(self, actual: f64, desired: f64) -> bool {
        match self {
            Self::Below => actual < desired,
            Self::AtMost => actual <= desired,
        }
    }
}

/// Where a tracked metric is read from each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Text endpoint answering `name value` lines.
    Scalar {
        url: String,
        /// Sample name to pick out of a multi-line payload
        #[serde(default)]
        sample: Option<String>,
    },
    /// Prometheus HTTP API instant query, one series per service.
    PrometheusQuery {
        base_url: String,
        query: String,
        /// Series label that identifies the service
        label_key: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedMetricConfig {
    pub name: String,
    #[serde(default)]
    pub help: String,
    pub rule: ComparisonRule,
    /// Seed value for `<name>_desired`; persisted operator updates win
    pub desired: f64,
    /// Exposition label name; required for labeled sources
    #[serde(default)]
    pub label: Option<String>,
    pub source: SourceConfig,
}

impl TrackedMetricConfig {
    pub fn desired_name(&self) -> String {
        format!("{}_desired", self.name)
    }
}

const SERVICE_PORTS: &str = "5000|5001|5002|5005";

pub fn default_tracked_metrics() -> Vec<TrackedMetricConfig> {
    vec![
        TrackedMetricConfig {
            name: "registered_users".into(),
            help: "Number of subscribed users".into(),
            rule: ComparisonRule::Below,
            desired: 20.0,
            label: None,
            source: SourceConfig::Scalar {
                url: "http://database-service:5000/metrics?name=utenti_registrati".into(),
                sample: Some("utenti_registrati".into()),
            },
        },
        TrackedMetricConfig {
            name: "request_count".into(),
            help: "Number of upstream weather requests served".into(),
            rule: ComparisonRule::AtMost,
            desired: 12.0,
            label: None,
            source: SourceConfig::Scalar {
                url: "http://scraper-service:5002/metrics?name=numero_richieste".into(),
                sample: Some("numero_richieste".into()),
            },
        },
        TrackedMetricConfig {
            name: "cpu_usage".into(),
            help: "CPU usage per service".into(),
            rule: ComparisonRule::AtMost,
            desired: 0.10,
            label: Some("service".into()),
            source: SourceConfig::PrometheusQuery {
                base_url: "http://prometheus:9090".into(),
                query: format!(
                    "container_cpu_system_seconds_total{{container_label_service_port=~\"{SERVICE_PORTS}\"}}"
                ),
                label_key: "container_label_service_port".into(),
            },
        },
        TrackedMetricConfig {
            name: "memory_usage".into(),
            help: "Peak memory usage in bytes per service".into(),
            rule: ComparisonRule::AtMost,
            desired: 72_683_648.0,
            label: Some("service".into()),
            source: SourceConfig::PrometheusQuery {
                base_url: "http://prometheus:9090".into(),
                query: format!(
                    "container_memory_max_usage_bytes{{container_label_service_port=~\"{SERVICE_PORTS}\"}}"
                ),
                label_key: "container_label_service_port".into(),
            },
        },
    ]
}
