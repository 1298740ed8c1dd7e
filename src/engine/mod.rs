pub mod aggregator;
pub mod collector;
pub mod cycle;
pub mod evaluator;
pub mod probability;
pub mod registry;
pub mod sources;

pub use aggregator::{LatchState, LatchView, ViolationAggregator, ViolationState, WindowLatch};
pub use collector::{MetricCollector, PollOutcome};
pub use cycle::{CollectedValue, EvaluationCycle};
pub use evaluator::{CheckResult, CheckSpec, Evaluation, SkipReason, SkippedCheck};
pub use probability::probability_of_violations;
pub use registry::{MetricDescriptor, MetricRegistry, MetricValue};
pub use sources::{CollectedSample, MetricSource};

use crate::config::Config;
use crate::error::{PersistenceError, PublishError, RegistryError};
use crate::platform::health;
use crate::publish::{EventPublisher, SlaEvent, create_publisher, exposition};
use crate::store::{InMemoryStateStore, PersistedMetric, StateStore, create_state_store};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

pub const CHECK_RESULTS_METRIC: &str = "sla_check_results";
pub const LIFETIME_METRIC: &str = "sla_violations_lifetime_total";
pub const WINDOW_METRIC_PREFIX: &str = "sla_violations_window_";

/// Horizon used for the probability carried in each cycle report.
const REPORT_HORIZON_MINUTES: i64 = 1;

/// Result of a desired-value upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesiredUpdate {
    pub applied: Vec<String>,
    pub ignored: BTreeMap<String, String>,
}

/// Outcome of an add/remove request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleOutcome {
    pub metric: String,
    pub changed: bool,
    pub message: String,
}

/// Builds the initial registry for `config`.
///
/// Per tracked quantity: the observed metric and its `_desired` companion.
/// Plus the check results, the lifetime counter and one gauge per window.
pub fn seed_registry(config: &Config) -> MetricRegistry {
    let mut registry = MetricRegistry::new();

    for metric in &config.metrics {
        let observed = match &metric.label {
            Some(label) => MetricDescriptor::labeled(&metric.name, &metric.help, label),
            None => MetricDescriptor::scalar(&metric.name, &metric.help, None),
        };
        registry.register(observed);
        registry.register(MetricDescriptor::scalar(
            metric.desired_name(),
            format!("Desired value for {}", metric.name),
            Some(metric.desired),
        ));
    }

    registry.register(MetricDescriptor::labeled(
        CHECK_RESULTS_METRIC,
        "Outcome of each check in the last cycle (1 = pass, 0 = fail)",
        "check",
    ));
    registry.register(MetricDescriptor::scalar(
        LIFETIME_METRIC,
        "Failed checks summed over every cycle since start",
        Some(0.0),
    ));
    for window in &config.evaluation.windows {
        registry.register(MetricDescriptor::scalar(
            format!("{WINDOW_METRIC_PREFIX}{}", window.label),
            format!(
                "Lifetime violations frozen {}s after start; 0 until then",
                window.deadline_secs
            ),
            Some(0.0),
        ));
    }

    registry
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The SLA evaluation engine.
///
/// Cycles are serialized by `cycle_lock`. Registry and aggregator sit behind
/// short-lived std locks that are never held across an await; store writes
/// from cycles and operator updates are serialized by `write_lock`.
pub struct SlaEngine {
    registry: RwLock<MetricRegistry>,
    aggregator: Mutex<ViolationAggregator>,
    collector: MetricCollector,
    specs: Vec<CheckSpec>,
    store: Arc<dyn StateStore>,
    publisher: Arc<dyn EventPublisher>,
    max_expected_violations: f64,
    started_at: Instant,
    cycles: AtomicU64,
    cycle_lock: tokio::sync::Mutex<()>,
    write_lock: tokio::sync::Mutex<()>,
    last_cycle: RwLock<Option<EvaluationCycle>>,
}

impl SlaEngine {
    /// Build sources, store and publisher from `config`, seed the registry
    /// and apply persisted values.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        let store = match create_state_store(&config.store, &config.workspace_dir).await {
            Ok(store) => store,
            Err(error) => {
                tracing::error!(%error, "state store unavailable; keeping state in memory only");
                health::mark_component_error("store", &error);
                Arc::new(InMemoryStateStore::new())
            }
        };
        let publisher = create_publisher(&config.bus)?;

        let timeout = Duration::from_secs(config.evaluation.source_timeout_secs);
        let client = sources::build_source_client(timeout);
        let mut collector = MetricCollector::new(timeout);
        for metric in &config.metrics {
            collector.bind(
                &metric.name,
                sources::create_source(&metric.name, &metric.source, client.clone(), timeout),
            );
        }

        let engine = Self::with_parts(config, collector, store, publisher);
        engine.load_persisted().await;
        Ok(engine)
    }

    /// Assemble an engine from prebuilt parts. Persisted values are not
    /// loaded; call [`Self::load_persisted`] for that.
    pub fn with_parts(
        config: &Config,
        collector: MetricCollector,
        store: Arc<dyn StateStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry: RwLock::new(seed_registry(config)),
            aggregator: Mutex::new(ViolationAggregator::new(&config.evaluation.windows)),
            collector,
            specs: config.metrics.iter().map(CheckSpec::from).collect(),
            store,
            publisher,
            max_expected_violations: config.evaluation.max_expected_violations,
            started_at: Instant::now(),
            cycles: AtomicU64::new(0),
            cycle_lock: tokio::sync::Mutex::new(()),
            write_lock: tokio::sync::Mutex::new(()),
            last_cycle: RwLock::new(None),
        }
    }

    /// Seed the registry from the store. Rows naming an active scalar metric
    /// are applied; anything else is ignored. Returns the number applied.
    pub async fn load_persisted(&self) -> usize {
        let rows = match self.store.load_all().await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(%error, "could not load persisted state; using seed values");
                health::mark_component_error("store", &error);
                return 0;
            }
        };

        let mut registry = write(&self.registry);
        let mut applied = 0;
        for row in rows {
            if registry
                .get(&row.name)
                .is_ok_and(|descriptor| matches!(descriptor.value, MetricValue::Scalar { .. }))
                && registry.set_value(&row.name, row.value, None).is_ok()
            {
                applied += 1;
            }
        }
        tracing::info!(applied, "persisted state loaded");
        applied
    }

    /// Run one poll-evaluate-aggregate-publish cycle.
    ///
    /// Waits for any cycle already in flight. Source, store and bus failures
    /// are logged and reflected in the report; none of them abort the cycle.
    pub async fn run_cycle(&self) -> EvaluationCycle {
        let _cycle = self.cycle_lock.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcomes = self
            .collector
            .collect(|metric| read(&self.registry).is_active(metric))
            .await;

        let evaluation = {
            let mut registry = write(&self.registry);
            for outcome in &outcomes {
                if let Ok(sample) = &outcome.result {
                    apply_sample(&mut registry, &outcome.metric, sample);
                }
            }
            evaluator::evaluate(&self.specs, &registry, &outcomes)
        };

        let failed_count = evaluation.failed_count();
        let uptime = self.started_at.elapsed();
        let (violations, newly_latched) = {
            let mut aggregator = lock(&self.aggregator);
            let newly_latched = aggregator.record_cycle(failed_count, uptime);
            (aggregator.snapshot(), newly_latched)
        };
        for window in &newly_latched {
            tracing::info!(
                window = %window,
                lifetime_count = violations.lifetime_count,
                "violation window latched"
            );
        }
        self.expose_results(&evaluation, &violations);

        let persisted = self.persist_results(&evaluation).await;
        let probability = probability_of_violations(
            failed_count,
            REPORT_HORIZON_MINUTES,
            self.max_expected_violations,
        );

        let event = SlaEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            cycle,
            evaluated_at: started_at,
            checks: evaluation
                .results
                .iter()
                .map(|result| (result.check_id.clone(), result.passed))
                .collect(),
            failed_count,
            lifetime_count: violations.lifetime_count,
        };
        let published = match self.publisher.publish(&event).await {
            Ok(()) => {
                health::mark_component_ok("publisher");
                true
            }
            Err(error) => {
                tracing::warn!(publisher = self.publisher.name(), %error, "event publish failed");
                health::mark_component_error("publisher", &error);
                false
            }
        };

        let report = EvaluationCycle {
            cycle,
            started_at,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            uptime_secs: uptime.as_secs(),
            collected: outcomes.iter().map(CollectedValue::from).collect(),
            results: evaluation.results,
            skipped: evaluation.skipped,
            failed_count,
            violations,
            newly_latched,
            probability,
            persisted,
            published,
        };

        health::mark_component_ok("evaluator");
        tracing::info!(
            cycle,
            checks = report.results.len(),
            skipped = report.skipped.len(),
            failed = failed_count,
            lifetime = report.violations.lifetime_count,
            "evaluation cycle complete"
        );
        *write(&self.last_cycle) = Some(report.clone());
        report
    }

    /// Mirror check outcomes and violation counters into their registry
    /// metrics. Removed metrics silently keep their last values.
    fn expose_results(&self, evaluation: &Evaluation, violations: &ViolationState) {
        let mut registry = write(&self.registry);
        for result in &evaluation.results {
            let value = if result.passed { 1.0 } else { 0.0 };
            let _ = registry.set_value(CHECK_RESULTS_METRIC, value, Some(&result.check_id));
        }
        #[allow(clippy::cast_precision_loss)]
        let _ = registry.set_value(LIFETIME_METRIC, violations.lifetime_count as f64, None);
        for window in &violations.windows {
            #[allow(clippy::cast_precision_loss)]
            let _ = registry.set_value(
                &format!("{WINDOW_METRIC_PREFIX}{}", window.label),
                window.value as f64,
                None,
            );
        }
    }

    async fn persist_results(&self, evaluation: &Evaluation) -> bool {
        let entries: Vec<(String, f64)> = evaluation
            .results
            .iter()
            .map(|result| (result.check_id.clone(), if result.passed { 1.0 } else { 0.0 }))
            .collect();

        let _write = self.write_lock.lock().await;
        match self.store.put_many(&entries).await {
            Ok(()) => {
                health::mark_component_ok("store");
                true
            }
            Err(error) => {
                tracing::warn!(store = self.store.name(), %error, "cycle results not persisted");
                health::mark_component_error("store", &error);
                false
            }
        }
    }

    /// Operator upsert of desired (or any other scalar) values.
    ///
    /// Each applied value is persisted individually; a persistence failure
    /// is logged and the in-memory value stays applied.
    pub async fn set_desired(&self, updates: &BTreeMap<String, f64>) -> DesiredUpdate {
        let _write = self.write_lock.lock().await;
        let mut outcome = DesiredUpdate::default();

        {
            let mut registry = write(&self.registry);
            for (name, value) in updates {
                let rejection = if name.starts_with("sla_") {
                    Some("engine-managed metric".to_string())
                } else if !value.is_finite() {
                    Some("value must be a finite number".to_string())
                } else {
                    registry
                        .set_value(name, *value, None)
                        .err()
                        .map(|error| error.to_string())
                };
                match rejection {
                    None => outcome.applied.push(name.clone()),
                    Some(reason) => {
                        outcome.ignored.insert(name.clone(), reason);
                    }
                }
            }
        }

        for name in &outcome.applied {
            let value = updates[name];
            match self.store.put(name, value).await {
                Ok(()) => health::mark_component_ok("store"),
                Err(error) => {
                    tracing::warn!(metric = %name, %error, "desired value not persisted");
                    health::mark_component_error("store", &error);
                }
            }
            tracing::info!(metric = %name, value, "metric value set by operator");
        }
        outcome
    }

    /// Current value of every active metric; labeled metrics expand to one
    /// `<name>_<label value>` entry per series. Unset scalars are omitted.
    pub fn status(&self) -> BTreeMap<String, f64> {
        let registry = read(&self.registry);
        let mut status = BTreeMap::new();
        for descriptor in registry.list_active() {
            match &descriptor.value {
                MetricValue::Scalar { value } => {
                    if let Some(value) = value {
                        status.insert(descriptor.name.clone(), *value);
                    }
                }
                MetricValue::Labeled { series, .. } => {
                    for (label, value) in series {
                        status.insert(format!("{}_{label}", descriptor.name), *value);
                    }
                }
            }
        }
        status
    }

    pub fn violations(&self) -> ViolationState {
        lock(&self.aggregator).snapshot()
    }

    /// Risk that a violation recurs within `minutes`, from the last cycle.
    pub fn probability(&self, minutes: i64) -> f64 {
        let failed = lock(&self.aggregator).last_cycle_failed();
        probability_of_violations(failed, minutes, self.max_expected_violations)
    }

    /// Restore a removed metric.
    pub fn add_metric(&self, name: &str) -> Result<LifecycleOutcome, RegistryError> {
        let result = write(&self.registry).restore(name);
        lifecycle_outcome(name, result.map(|_| format!("metric {name} restored")))
    }

    /// Move a metric to the removed state, keeping its last value.
    pub fn remove_metric(&self, name: &str) -> Result<LifecycleOutcome, RegistryError> {
        let result = write(&self.registry).remove(name);
        lifecycle_outcome(name, result.map(|_| format!("metric {name} removed")))
    }

    /// Text exposition of every active metric.
    pub fn scrape(&self) -> Result<String, PublishError> {
        let registry = read(&self.registry);
        exposition::render(registry.list_active())
    }

    pub async fn persisted_state(&self) -> Result<Vec<PersistedMetric>, PersistenceError> {
        self.store.load_all().await
    }

    /// Wait up to `grace` for an in-flight cycle. Returns false on timeout.
    pub async fn quiesce(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.cycle_lock.lock())
            .await
            .is_ok()
    }

    pub fn registry(&self) -> MetricRegistry {
        read(&self.registry).clone()
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn last_cycle(&self) -> Option<EvaluationCycle> {
        read(&self.last_cycle).clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

fn apply_sample(registry: &mut MetricRegistry, metric: &str, sample: &CollectedSample) {
    let result = match sample {
        CollectedSample::Scalar(value) => registry.set_value(metric, *value, None),
        CollectedSample::Labeled(series) => series
            .iter()
            .try_for_each(|(label, value)| registry.set_value(metric, *value, Some(label))),
    };
    if let Err(error) = result {
        tracing::debug!(metric, %error, "collected sample not written");
    }
}

fn lifecycle_outcome(
    name: &str,
    result: Result<String, RegistryError>,
) -> Result<LifecycleOutcome, RegistryError> {
    match result {
        Ok(message) => {
            tracing::info!(metric = name, %message, "metric lifecycle change");
            Ok(LifecycleOutcome {
                metric: name.to_string(),
                changed: true,
                message,
            })
        }
        Err(error) if error.is_informative() => Ok(LifecycleOutcome {
            metric: name.to_string(),
            changed: false,
            message: error.to_string(),
        }),
        Err(error) => Err(error),
    }
}
