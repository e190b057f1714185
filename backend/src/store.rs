//! Process-local persistent key-value store
//!
//! Records are JSON documents keyed `{collection}:{date}` in a single SQLite
//! table. Every write carries a version so callers can detect and reject
//! stale read-modify-write cycles instead of overwriting newer data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::AppResult;

/// Keyed collections held in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Lifecycle,
    Verification,
    PredictionLog,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Lifecycle => "lifecycle",
            Collection::Verification => "verification",
            Collection::PredictionLog => "prediction_log",
        }
    }

    pub fn key(&self, date: NaiveDate) -> String {
        format!("{}:{}", self.as_str(), date)
    }
}

/// A decoded record together with the version it was read at
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { version: i64 },
    /// Another writer got there first; nothing was changed
    Stale,
}

#[derive(Clone)]
pub struct RecordStore {
    db: SqlitePool,
}

impl RecordStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open a pool against a SQLite URL and apply migrations
    pub async fn connect(url: &str, max_connections: u32, min_connections: u32) -> AppResult<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(url)
            .await?;
        let store = Self::new(db);
        store.migrate().await?;
        Ok(store)
    }

    /// Single-connection in-memory store; the database lives as long as the pool
    pub async fn in_memory() -> AppResult<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(db);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }

    /// Raw JSON and version for a key
    pub async fn get_raw(
        &self,
        collection: Collection,
        date: NaiveDate,
    ) -> AppResult<Option<(String, i64)>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT value, version FROM kv_records WHERE key = ?",
        )
        .bind(collection.key(date))
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        date: NaiveDate,
    ) -> AppResult<Option<Versioned<T>>> {
        match self.get_raw(collection, date).await? {
            Some((raw, version)) => Ok(Some(Versioned {
                value: serde_json::from_str(&raw)?,
                version,
            })),
            None => Ok(None),
        }
    }

    /// Insert a record only if the key does not exist yet
    pub async fn insert_new_raw(
        &self,
        collection: Collection,
        date: NaiveDate,
        raw: &str,
        now: DateTime<Utc>,
    ) -> AppResult<WriteOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO kv_records (key, collection, target_date, value, version, updated_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(collection.key(date))
        .bind(collection.as_str())
        .bind(date.to_string())
        .bind(raw)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(WriteOutcome::Stale);
        }
        Ok(WriteOutcome::Written { version: 1 })
    }

    pub async fn insert_new<T: Serialize>(
        &self,
        collection: Collection,
        date: NaiveDate,
        value: &T,
        now: DateTime<Utc>,
    ) -> AppResult<WriteOutcome> {
        let raw = serde_json::to_string(value)?;
        self.insert_new_raw(collection, date, &raw, now).await
    }

    /// Replace a record only if it is still at `expected_version`
    pub async fn compare_and_swap<T: Serialize>(
        &self,
        collection: Collection,
        date: NaiveDate,
        expected_version: i64,
        value: &T,
        now: DateTime<Utc>,
    ) -> AppResult<WriteOutcome> {
        let raw = serde_json::to_string(value)?;
        let result = sqlx::query(
            r#"
            UPDATE kv_records
            SET value = ?, version = version + 1, updated_at = ?
            WHERE key = ? AND version = ?
            "#,
        )
        .bind(&raw)
        .bind(now.to_rfc3339())
        .bind(collection.key(date))
        .bind(expected_version)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(WriteOutcome::Stale);
        }
        Ok(WriteOutcome::Written {
            version: expected_version + 1,
        })
    }

    /// Insert when `expected_version` is `None`, compare-and-swap otherwise
    pub async fn put<T: Serialize>(
        &self,
        collection: Collection,
        date: NaiveDate,
        expected_version: Option<i64>,
        value: &T,
        now: DateTime<Utc>,
    ) -> AppResult<WriteOutcome> {
        match expected_version {
            Some(version) => {
                self.compare_and_swap(collection, date, version, value, now)
                    .await
            }
            None => self.insert_new(collection, date, value, now).await,
        }
    }

    /// Most recent records of a collection, newest target date first
    pub async fn list_recent_raw(&self, collection: Collection, limit: u32) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value FROM kv_records
            WHERE collection = ?
            ORDER BY target_date DESC
            LIMIT ?
            "#,
        )
        .bind(collection.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Delete every record of a collection whose target date is before `cutoff`
    pub async fn purge_before(&self, collection: Collection, cutoff: NaiveDate) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM kv_records WHERE collection = ? AND target_date < ?")
            .bind(collection.as_str())
            .bind(cutoff.to_string())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
