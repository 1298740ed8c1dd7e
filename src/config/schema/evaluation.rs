use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Seconds between evaluation cycles (default: 15)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-source poll budget in seconds (default: 5)
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    /// Normalizer for the violation probability heuristic (default: 10)
    #[serde(default = "default_max_expected_violations")]
    pub max_expected_violations: f64,
    /// How long shutdown waits for an in-flight cycle (default: 10)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// One-shot violation windows, deadlines relative to engine start
    #[serde(default = "default_windows")]
    pub windows: Vec<WindowConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub label: String,
    pub deadline_secs: u64,
}

impl WindowConfig {
    pub fn new(label: impl Into<String>, deadline_secs: u64) -> Self {
        Self {
            label: label.into(),
            deadline_secs,
        }
    }
}

fn default_interval_secs() -> u64 {
    15
}

fn default_source_timeout_secs() -> u64 {
    5
}

fn default_max_expected_violations() -> f64 {
    10.0
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_windows() -> Vec<WindowConfig> {
    vec![
        WindowConfig::new("1h", 3_600),
        WindowConfig::new("3h", 10_800),
        WindowConfig::new("6h", 21_600),
    ]
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            source_timeout_secs: default_source_timeout_secs(),
            max_expected_violations: default_max_expected_violations(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            windows: default_windows(),
        }
    }
}
