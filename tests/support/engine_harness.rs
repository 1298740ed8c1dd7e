#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slawarden::config::{
    BusBackend, ComparisonRule, Config, SourceConfig, StoreBackend, TrackedMetricConfig,
    WindowConfig,
};
use slawarden::engine::sources::PollFuture;
use slawarden::engine::{CollectedSample, MetricCollector, MetricSource, SlaEngine};
use slawarden::error::{PersistenceError, PublishError, SourceError};
use slawarden::publish::{EventPublisher, PublishFuture, SlaEvent};
use slawarden::store::{InMemoryStateStore, PersistedMetric, StateStore, StoreFuture};

pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

pub fn scalar_metric(name: &str, rule: ComparisonRule, desired: f64, url: &str) -> TrackedMetricConfig {
    TrackedMetricConfig {
        name: name.to_string(),
        help: format!("{name} under test"),
        rule,
        desired,
        label: None,
        source: SourceConfig::Scalar {
            url: url.to_string(),
            sample: None,
        },
    }
}

pub fn labeled_metric(name: &str, desired: f64, base_url: &str) -> TrackedMetricConfig {
    TrackedMetricConfig {
        name: name.to_string(),
        help: format!("{name} per service"),
        rule: ComparisonRule::AtMost,
        desired,
        label: Some("service".to_string()),
        source: SourceConfig::PrometheusQuery {
            base_url: base_url.to_string(),
            query: format!("{name}_total"),
            label_key: "container_label_service_port".to_string(),
        },
    }
}

/// users (below 20), requests (at most 12), cpu (at most 0.10 per service);
/// windows at 36s, 56s and 86s; in-memory store; no bus.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config {
        workspace_dir: dir.join("workspace"),
        config_path: dir.join("config.toml"),
        ..Config::default()
    };
    config.metrics = vec![
        scalar_metric("users", ComparisonRule::Below, 20.0, "http://127.0.0.1:9/users"),
        scalar_metric("requests", ComparisonRule::AtMost, 12.0, "http://127.0.0.1:9/requests"),
        labeled_metric("cpu", 0.10, "http://127.0.0.1:9"),
    ];
    config.evaluation.windows = vec![
        WindowConfig::new("w1", 36),
        WindowConfig::new("w2", 56),
        WindowConfig::new("w3", 86),
    ];
    config.store.backend = StoreBackend::Memory;
    config.bus.backend = BusBackend::None;
    config
}

pub fn scalar(value: f64) -> Result<CollectedSample, SourceError> {
    Ok(CollectedSample::Scalar(value))
}

pub fn labeled(series: &[(&str, f64)]) -> Result<CollectedSample, SourceError> {
    Ok(CollectedSample::Labeled(
        series
            .iter()
            .map(|(label, value)| ((*label).to_string(), *value))
            .collect::<BTreeMap<_, _>>(),
    ))
}

pub fn unavailable(metric: &str) -> Result<CollectedSample, SourceError> {
    Err(SourceError::Status {
        metric: metric.to_string(),
        status: 503,
    })
}

/// Replays a fixed script of poll results; the last step repeats forever.
pub struct ScriptedSource {
    steps: Vec<Result<CollectedSample, SourceError>>,
    cursor: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Result<CollectedSample, SourceError>>) -> Arc<Self> {
        assert!(!steps.is_empty(), "script needs at least one step");
        Arc::new(Self {
            steps,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn polls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl MetricSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".into()
    }

    fn poll(&self) -> PollFuture<'_> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let step = self.steps[index.min(self.steps.len() - 1)].clone();
        Box::pin(async move { step })
    }
}

pub fn scripted(steps: Vec<Result<CollectedSample, SourceError>>) -> Arc<dyn MetricSource> {
    ScriptedSource::new(steps)
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SlaEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<SlaEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn publish<'a>(&'a self, event: &'a SlaEvent) -> PublishFuture<'a> {
        self.events.lock().unwrap().push(event.clone());
        Box::pin(async { Ok(()) })
    }
}

pub struct FailingPublisher;

impl EventPublisher for FailingPublisher {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn publish<'a>(&'a self, _event: &'a SlaEvent) -> PublishFuture<'a> {
        Box::pin(async { Err(PublishError::Transport("connection refused".into())) })
    }
}

pub struct FailingStore;

impl StateStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn put<'a>(&'a self, _name: &'a str, _value: f64) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(PersistenceError::Write("disk full".into())) })
    }

    fn put_many<'a>(&'a self, _entries: &'a [(String, f64)]) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(PersistenceError::Write("disk full".into())) })
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<PersistedMetric>> {
        Box::pin(async { Err(PersistenceError::Read("disk unreadable".into())) })
    }
}

pub struct Harness {
    pub engine: Arc<SlaEngine>,
    pub publisher: Arc<RecordingPublisher>,
}

pub fn collector(sources: Vec<(&str, Arc<dyn MetricSource>)>) -> MetricCollector {
    let mut collector = MetricCollector::new(Duration::from_secs(1));
    for (metric, source) in sources {
        collector.bind(metric, source);
    }
    collector
}

pub fn harness(config: &Config, sources: Vec<(&str, Arc<dyn MetricSource>)>) -> Harness {
    harness_with_store(config, sources, Arc::new(InMemoryStateStore::new()))
}

pub fn harness_with_store(
    config: &Config,
    sources: Vec<(&str, Arc<dyn MetricSource>)>,
    store: Arc<dyn StateStore>,
) -> Harness {
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = SlaEngine::with_parts(
        config,
        collector(sources),
        store,
        Arc::clone(&publisher) as Arc<dyn EventPublisher>,
    );
    Harness {
        engine: Arc::new(engine),
        publisher,
    }
}
