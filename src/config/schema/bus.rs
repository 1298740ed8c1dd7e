use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    None,
    #[default]
    Log,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub backend: BusBackend,
    /// REST proxy base URL, e.g. `http://kafka-rest:8082`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Record key attached to every event
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_topic() -> String {
    "prometheusdata".into()
}

fn default_key() -> String {
    "sla-engine".into()
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::default(),
            url: None,
            topic: default_topic(),
            key: default_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
