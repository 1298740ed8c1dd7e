use crate::error::RegistryError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Current value of a tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    /// `None` until the first value is written.
    Scalar { value: Option<f64> },
    /// One value per label value, e.g. per service.
    Labeled {
        label: String,
        series: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub value: MetricValue,
}

impl MetricDescriptor {
    pub fn scalar(name: impl Into<String>, help: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: MetricValue::Scalar { value },
        }
    }

    pub fn labeled(
        name: impl Into<String>,
        help: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: MetricValue::Labeled {
                label: label.into(),
                series: BTreeMap::new(),
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.value {
            MetricValue::Scalar { .. } => "scalar",
            MetricValue::Labeled { .. } => "labeled",
        }
    }

    pub fn scalar_value(&self) -> Option<f64> {
        match self.value {
            MetricValue::Scalar { value } => value,
            MetricValue::Labeled { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Active(MetricDescriptor),
    Removed(MetricDescriptor),
}

/// Owned set of tracked metrics.
///
/// Every name maps to exactly one slot, so a metric is either active or held
/// in the removed state with its last value, never both. Callers wrap the
/// registry in a lock and are the single writer while holding it.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    slots: BTreeMap<String, Slot>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `descriptor` as an active metric.
    pub fn register(&mut self, descriptor: MetricDescriptor) {
        self.slots
            .insert(descriptor.name.clone(), Slot::Active(descriptor));
    }

    pub fn remove(&mut self, name: &str) -> Result<MetricDescriptor, RegistryError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        match &*slot {
            Slot::Removed(_) => Err(RegistryError::AlreadyRemoved(name.to_string())),
            Slot::Active(descriptor) => {
                let descriptor = descriptor.clone();
                *slot = Slot::Removed(descriptor.clone());
                Ok(descriptor)
            }
        }
    }

    pub fn restore(&mut self, name: &str) -> Result<MetricDescriptor, RegistryError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        match &*slot {
            Slot::Active(_) => Err(RegistryError::NeverRemoved(name.to_string())),
            Slot::Removed(descriptor) => {
                let descriptor = descriptor.clone();
                *slot = Slot::Active(descriptor.clone());
                Ok(descriptor)
            }
        }
    }

    /// Look up an active metric. Removed metrics are reported as not found.
    pub fn get(&self, name: &str) -> Result<&MetricDescriptor, RegistryError> {
        match self.slots.get(name) {
            Some(Slot::Active(descriptor)) => Ok(descriptor),
            _ => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Active(_)))
    }

    pub fn is_removed(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Removed(_)))
    }

    /// Write a value into an active metric.
    ///
    /// Scalar metrics take `label = None`; labeled metrics require the label
    /// value of the series being written.
    pub fn set_value(
        &mut self,
        name: &str,
        value: f64,
        label: Option<&str>,
    ) -> Result<(), RegistryError> {
        let Some(Slot::Active(descriptor)) = self.slots.get_mut(name) else {
            return Err(RegistryError::NotFound(name.to_string()));
        };
        let actual = descriptor.kind_name();
        match (&mut descriptor.value, label) {
            (MetricValue::Scalar { value: current }, None) => {
                *current = Some(value);
                Ok(())
            }
            (MetricValue::Labeled { series, .. }, Some(label)) => {
                series.insert(label.to_string(), value);
                Ok(())
            }
            (MetricValue::Scalar { .. }, Some(_)) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected: "labeled",
                actual,
            }),
            (MetricValue::Labeled { .. }, None) => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                expected: "scalar",
                actual,
            }),
        }
    }

    pub fn list_active(&self) -> Vec<&MetricDescriptor> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Active(descriptor) => Some(descriptor),
                Slot::Removed(_) => None,
            })
            .collect()
    }

    pub fn removed_names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Removed(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
