pub mod exposition;
pub mod http;

pub use http::RestProxyPublisher;

use crate::config::{BusBackend, BusConfig};
use crate::error::PublishError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// One evaluation cycle as seen by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaEvent {
    pub event_id: String,
    pub cycle: u64,
    pub evaluated_at: DateTime<Utc>,
    pub checks: BTreeMap<String, bool>,
    pub failed_count: u64,
    pub lifetime_count: u64,
}

pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'a>>;

/// Message-bus sink for cycle events.
pub trait EventPublisher: Send + Sync {
    fn name(&self) -> &'static str;

    fn publish<'a>(&'a self, event: &'a SlaEvent) -> PublishFuture<'a>;
}

/// Drops every event.
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn name(&self) -> &'static str {
        "none"
    }

    fn publish<'a>(&'a self, _event: &'a SlaEvent) -> PublishFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Writes each event to the log under its topic.
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl EventPublisher for LogPublisher {
    fn name(&self) -> &'static str {
        "log"
    }

    fn publish<'a>(&'a self, event: &'a SlaEvent) -> PublishFuture<'a> {
        Box::pin(async move {
            let payload =
                serde_json::to_string(event).map_err(|e| PublishError::Encode(e.to_string()))?;
            tracing::info!(topic = %self.topic, cycle = event.cycle, %payload, "sla event");
            Ok(())
        })
    }
}

pub fn create_publisher(config: &BusConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    let publisher: Arc<dyn EventPublisher> = match config.backend {
        BusBackend::None => Arc::new(NoopPublisher),
        BusBackend::Log => Arc::new(LogPublisher::new(&config.topic)),
        BusBackend::Http => {
            let Some(url) = config.url.as_deref() else {
                anyhow::bail!("bus.url is required for the http bus backend");
            };
            Arc::new(RestProxyPublisher::new(
                url,
                &config.topic,
                &config.key,
                Duration::from_secs(config.timeout_secs),
            ))
        }
    };
    Ok(publisher)
}
