use super::{PersistedMetric, StateStore, StoreFuture};
use crate::error::PersistenceError;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sla_metrics (
    metric_name  TEXT PRIMARY KEY,
    metric_value REAL NOT NULL,
    updated_at   TEXT NOT NULL
)";

const UPSERT: &str = "
INSERT INTO sla_metrics (metric_name, metric_value, updated_at)
VALUES ($1, $2, $3)
ON CONFLICT(metric_name) DO UPDATE SET
    metric_value = excluded.metric_value,
    updated_at   = excluded.updated_at";

/// SQLite-backed state: one row per metric name.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::Open(format!("create {}: {e}", parent.display())))?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| PersistenceError::Open(format!("{}: {e}", path.display())))?;
        Self::new(pool).await
    }

    /// Single-connection in-memory database.
    pub async fn in_memory() -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| PersistenceError::Open(e.to_string()))?;
        Self::new(pool).await
    }

    /// Wrap an existing pool and create the schema.
    pub async fn new(pool: SqlitePool) -> Result<Self, PersistenceError> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| PersistenceError::Open(format!("create sla_metrics table: {e}")))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StateStore for SqliteStateStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put<'a>(&'a self, name: &'a str, value: f64) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(UPSERT)
                .bind(name)
                .bind(value)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await
                .map_err(|e| PersistenceError::Write(format!("{name}: {e}")))?;
            Ok(())
        })
    }

    fn put_many<'a>(&'a self, entries: &'a [(String, f64)]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if entries.is_empty() {
                return Ok(());
            }
            let now = Utc::now().to_rfc3339();
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| PersistenceError::Write(format!("begin: {e}")))?;

            for (name, value) in entries {
                sqlx::query(UPSERT)
                    .bind(name)
                    .bind(*value)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| PersistenceError::Write(format!("{name}: {e}")))?;
            }

            // An early return drops `tx`, which rolls the batch back.
            tx.commit()
                .await
                .map_err(|e| PersistenceError::Write(format!("commit: {e}")))
        })
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<PersistedMetric>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT metric_name, metric_value, updated_at
                 FROM sla_metrics
                 ORDER BY metric_name",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PersistenceError::Read(e.to_string()))?;

            rows.iter()
                .map(|row| {
                    Ok(PersistedMetric {
                        name: row.try_get("metric_name")?,
                        value: row.try_get("metric_value")?,
                        updated_at: row.try_get("updated_at")?,
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(|e| PersistenceError::Read(e.to_string()))
        })
    }
}
