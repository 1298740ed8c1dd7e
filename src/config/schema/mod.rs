mod bus;
mod core;
mod evaluation;
mod gateway;
mod metrics;
mod store;

pub use bus::{BusBackend, BusConfig};
pub use core::{Config, ReliabilityConfig};
pub use evaluation::{EvaluationConfig, WindowConfig};
pub use gateway::GatewayConfig;
pub use metrics::{ComparisonRule, SourceConfig, TrackedMetricConfig, default_tracked_metrics};
pub use store::{StoreBackend, StoreConfig};
