use super::Config;
use crate::config::SourceConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Names the engine seeds for itself; tracked metrics may not shadow them.
const RESERVED_PREFIX: &str = "sla_";

fn is_metric_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_label_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("__")
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_evaluation()?;
        self.validate_metrics()?;
        self.validate_bus()
    }

    fn validate_evaluation(&self) -> Result<(), ConfigError> {
        let evaluation = &self.evaluation;

        if evaluation.interval_secs == 0 {
            return Err(invalid("evaluation.interval_secs must be at least 1"));
        }
        if evaluation.source_timeout_secs == 0 {
            return Err(invalid("evaluation.source_timeout_secs must be at least 1"));
        }
        if !evaluation.max_expected_violations.is_finite()
            || evaluation.max_expected_violations <= 0.0
        {
            return Err(invalid(
                "evaluation.max_expected_violations must be a positive number",
            ));
        }
        if evaluation.windows.is_empty() {
            return Err(invalid("evaluation.windows must define at least one window"));
        }

        let mut labels = HashSet::new();
        let mut previous: Option<u64> = None;
        for window in &evaluation.windows {
            if window.label.is_empty()
                || !window
                    .label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(invalid(format!(
                    "window label '{}' may only contain letters, digits and underscores",
                    window.label
                )));
            }
            if !labels.insert(window.label.as_str()) {
                return Err(invalid(format!("duplicate window label '{}'", window.label)));
            }
            if previous.is_some_and(|prev| window.deadline_secs <= prev) {
                return Err(invalid(
                    "evaluation.windows deadlines must be strictly increasing",
                ));
            }
            previous = Some(window.deadline_secs);
        }
        Ok(())
    }

    fn validate_metrics(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for metric in &self.metrics {
            if !is_metric_identifier(&metric.name) {
                return Err(invalid(format!(
                    "metric name '{}' is not a valid identifier",
                    metric.name
                )));
            }
            if metric.name.starts_with(RESERVED_PREFIX) {
                return Err(invalid(format!(
                    "metric name '{}' uses the reserved '{RESERVED_PREFIX}' prefix",
                    metric.name
                )));
            }
            if !metric.desired.is_finite() {
                return Err(invalid(format!(
                    "metric '{}' desired value must be finite",
                    metric.name
                )));
            }
            for generated in [metric.name.clone(), metric.desired_name()] {
                if !names.insert(generated.clone()) {
                    return Err(invalid(format!("duplicate metric name '{generated}'")));
                }
            }

            match (&metric.source, metric.label.as_deref()) {
                (SourceConfig::Scalar { .. }, Some(_)) => {
                    return Err(invalid(format!(
                        "metric '{}' has a scalar source and cannot declare a label",
                        metric.name
                    )));
                }
                (SourceConfig::PrometheusQuery { .. }, None) => {
                    return Err(invalid(format!(
                        "metric '{}' has a labeled source and must declare a label",
                        metric.name
                    )));
                }
                (_, Some(label)) if !is_label_identifier(label) => {
                    return Err(invalid(format!(
                        "metric '{}' label '{label}' is not a valid label name",
                        metric.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_bus(&self) -> Result<(), ConfigError> {
        if self.bus.topic.trim().is_empty() {
            return Err(invalid("bus.topic must not be empty"));
        }
        if self.bus.backend == crate::config::BusBackend::Http && self.bus.url.is_none() {
            return Err(invalid("bus.url is required for the http bus backend"));
        }
        Ok(())
    }
}
