use super::{PersistedMetric, StateStore, StoreFuture};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Process-local state; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStateStore {
    rows: Mutex<BTreeMap<String, (f64, String)>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, entries: &[(String, f64)]) {
        let now = Utc::now().to_rfc3339();
        let mut rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (name, value) in entries {
            rows.insert(name.clone(), (*value, now.clone()));
        }
    }
}

impl StateStore for InMemoryStateStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put<'a>(&'a self, name: &'a str, value: f64) -> StoreFuture<'a, ()> {
        self.write(&[(name.to_string(), value)]);
        Box::pin(async { Ok(()) })
    }

    fn put_many<'a>(&'a self, entries: &'a [(String, f64)]) -> StoreFuture<'a, ()> {
        self.write(entries);
        Box::pin(async { Ok(()) })
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<PersistedMetric>> {
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(name, (value, updated_at))| PersistedMetric {
                name: name.clone(),
                value: *value,
                updated_at: updated_at.clone(),
            })
            .collect();
        Box::pin(async move { Ok(rows) })
    }
}
