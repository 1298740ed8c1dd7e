use super::super::{
    BusConfig, EvaluationConfig, GatewayConfig, StoreConfig, TrackedMetricConfig,
    default_tracked_metrics,
};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Tracked quantities, each with a source, a rule and a seed desired value
    #[serde(default = "default_tracked_metrics")]
    pub metrics: Vec<TrackedMetricConfig>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

/// Restart policy for supervised daemon components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_component_backoff_secs")]
    pub component_initial_backoff_secs: u64,
    #[serde(default = "default_component_backoff_max_secs")]
    pub component_max_backoff_secs: u64,
    /// 0 disables the restart circuit breaker
    #[serde(default = "default_component_max_restarts")]
    pub component_max_restarts: u32,
}

fn default_component_backoff_secs() -> u64 {
    2
}

fn default_component_backoff_max_secs() -> u64 {
    60
}

fn default_component_max_restarts() -> u32 {
    10
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            component_initial_backoff_secs: default_component_backoff_secs(),
            component_max_backoff_secs: default_component_backoff_max_secs(),
            component_max_restarts: default_component_max_restarts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let slawarden_dir = home.join(".slawarden");

        Self {
            workspace_dir: slawarden_dir.join("workspace"),
            config_path: slawarden_dir.join("config.toml"),
            gateway: GatewayConfig::default(),
            evaluation: EvaluationConfig::default(),
            metrics: default_tracked_metrics(),
            store: StoreConfig::default(),
            bus: BusConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}
