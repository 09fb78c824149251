//! Snapshot cache: one `cached_values` record per leaderboard table.
//!
//! Writes are whole-record upserts, so a reader sees either the previous
//! snapshot or the new one, never a mix.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tmboard_core::{BoardTable, Snapshot};
use tokio::sync::RwLock;

use crate::DbError;

/// A row from the `cached_values` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CachedValueRow {
    pub name: String,
    pub value: serde_json::Value,
    pub ts: f64,
    /// Stored as `BIGINT`; the schema rejects negatives.
    pub min_refresh_period: i64,
    pub updated_at: DateTime<Utc>,
}

impl CachedValueRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if `min_refresh_period` is negative.
    pub fn into_snapshot(self) -> Result<Snapshot, DbError> {
        let min_refresh_period =
            u64::try_from(self.min_refresh_period).map_err(|e| DbError::InvalidValue {
                field: "min_refresh_period",
                reason: e.to_string(),
            })?;
        Ok(Snapshot {
            entries: self.value,
            ts: self.ts,
            min_refresh_period,
        })
    }
}

/// Fetches the cached record stored under `name`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_value(
    pool: &PgPool,
    name: &str,
) -> Result<Option<CachedValueRow>, DbError> {
    let row = sqlx::query_as::<_, CachedValueRow>(
        "SELECT name, value, ts, min_refresh_period, updated_at \
         FROM cached_values WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or replaces the record stored under `name`.
///
/// # Errors
///
/// Returns [`DbError::InvalidValue`] if the refresh period does not fit a
/// `BIGINT`, or [`DbError::Sqlx`] if the upsert fails.
pub async fn put_cached_value(
    pool: &PgPool,
    name: &str,
    snapshot: &Snapshot,
) -> Result<CachedValueRow, DbError> {
    let min_refresh_period =
        i64::try_from(snapshot.min_refresh_period).map_err(|e| DbError::InvalidValue {
            field: "min_refresh_period",
            reason: e.to_string(),
        })?;

    let row = sqlx::query_as::<_, CachedValueRow>(
        "INSERT INTO cached_values (name, value, ts, min_refresh_period) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (name) DO UPDATE SET \
             value = EXCLUDED.value, \
             ts = EXCLUDED.ts, \
             min_refresh_period = EXCLUDED.min_refresh_period, \
             updated_at = NOW() \
         RETURNING name, value, ts, min_refresh_period, updated_at",
    )
    .bind(name)
    .bind(&snapshot.entries)
    .bind(snapshot.ts)
    .bind(min_refresh_period)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Where table snapshots live between refreshes.
pub trait SnapshotStore: Send + Sync {
    /// Latest snapshot for `table`, or `None` before the first successful refresh.
    fn get(
        &self,
        table: BoardTable,
    ) -> impl Future<Output = Result<Option<Snapshot>, DbError>> + Send;

    /// Replaces the snapshot for `table` as a single write.
    fn put(
        &self,
        table: BoardTable,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn ping(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SnapshotStore for PgSnapshotStore {
    async fn get(&self, table: BoardTable) -> Result<Option<Snapshot>, DbError> {
        get_cached_value(&self.pool, table.cache_key())
            .await?
            .map(CachedValueRow::into_snapshot)
            .transpose()
    }

    async fn put(&self, table: BoardTable, snapshot: &Snapshot) -> Result<(), DbError> {
        put_cached_value(&self.pool, table.cache_key(), snapshot).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }
}

/// In-process store for tests and database-less runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    values: Arc<RwLock<HashMap<&'static str, Snapshot>>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, table: BoardTable) -> Result<Option<Snapshot>, DbError> {
        Ok(self.values.read().await.get(table.cache_key()).cloned())
    }

    async fn put(&self, table: BoardTable, snapshot: &Snapshot) -> Result<(), DbError> {
        self.values
            .write()
            .await
            .insert(table.cache_key(), snapshot.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
