use super::{EventPublisher, PublishFuture, SlaEvent};
use crate::error::PublishError;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    key: &'a str,
    value: &'a SlaEvent,
}

/// Produces events through a Kafka REST proxy: `POST <url>/topics/<topic>`.
pub struct RestProxyPublisher {
    endpoint: String,
    topic: String,
    key: String,
    client: Client,
}

impl RestProxyPublisher {
    pub fn new(url: &str, topic: &str, key: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            endpoint: format!("{}/topics/{topic}", url.trim_end_matches('/')),
            topic: topic.to_string(),
            key: key.to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EventPublisher for RestProxyPublisher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn publish<'a>(&'a self, event: &'a SlaEvent) -> PublishFuture<'a> {
        Box::pin(async move {
            let body = serde_json::to_vec(&ProduceRequest {
                records: [ProduceRecord {
                    key: &self.key,
                    value: event,
                }],
            })
            .map_err(|e| PublishError::Encode(e.to_string()))?;

            let response = self
                .client
                .post(&self.endpoint)
                .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                .body(body)
                .send()
                .await
                .map_err(|e| PublishError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PublishError::Rejected {
                    topic: self.topic.clone(),
                    status: status.as_u16(),
                });
            }
            tracing::debug!(topic = %self.topic, cycle = event.cycle, "event produced");
            Ok(())
        })
    }
}
