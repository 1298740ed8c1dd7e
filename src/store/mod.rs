pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStateStore;
pub use sqlite::SqliteStateStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::PersistenceError;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

/// One persisted `metric name -> value` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedMetric {
    pub name: String,
    pub value: f64,
    pub updated_at: String,
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// Durable key/value state.
///
/// `put_many` is all-or-nothing: after a crash or cancellation either every
/// entry of the batch is visible on the next `load_all` or none is.
pub trait StateStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn put<'a>(&'a self, name: &'a str, value: f64) -> StoreFuture<'a, ()>;

    fn put_many<'a>(&'a self, entries: &'a [(String, f64)]) -> StoreFuture<'a, ()>;

    /// Every row, ordered by name.
    fn load_all(&self) -> StoreFuture<'_, Vec<PersistedMetric>>;
}

pub async fn create_state_store(
    config: &StoreConfig,
    workspace_dir: &Path,
) -> anyhow::Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.backend {
        StoreBackend::Sqlite => {
            let path = config.resolve_path(workspace_dir);
            Arc::new(SqliteStateStore::open(&path).await?)
        }
        StoreBackend::Memory => Arc::new(InMemoryStateStore::new()),
    };
    tracing::info!(backend = store.name(), "state store ready");
    Ok(store)
}
