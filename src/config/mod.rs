pub mod schema;

pub use schema::{
    BusBackend, BusConfig, ComparisonRule, Config, EvaluationConfig, GatewayConfig,
    ReliabilityConfig, SourceConfig, StoreBackend, StoreConfig, TrackedMetricConfig,
    WindowConfig,
};
