//! Expiring key-value storage for sessions and OAuth state.
//!
//! Values are opaque strings (callers store JSON). Expiry is checked on read,
//! so an expired entry behaves exactly like a missing one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tokio::sync::RwLock;

use crate::error::{StoreResult, map_sqlx_error};

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite `key`. `ttl = None` never expires.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Read and remove in one step; a second `take` of the same key sees nothing.
    async fn take(&self, key: &str) -> StoreResult<Option<String>>;
}

#[async_trait]
impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        (**self).put(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).take(key).await
    }
}

/// A TTL too large to represent is treated as "never expires".
fn expiry(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl?).ok()?;
    Utc::now().checked_add_signed(ttl)
}

fn is_live(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.is_none_or(|at| at > Utc::now())
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| is_live(e.expires_at))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expiry(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .filter(|e| is_live(e.expires_at))
            .map(|e| e.value))
    }
}

/// Store backed by the `kv_entries` table. Expiry is kept as unix milliseconds.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Drop expired rows. Reads already ignore them; this only reclaims space.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_kv", e))?;
        Ok(result.rows_affected())
    }
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT value, expires_at FROM kv_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("kv_get", e))?;

        Ok(row
            .filter(|(_, expires)| is_live(from_millis(*expires)))
            .map(|(value, _)| value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expiry(ttl).map(|at| at.timestamp_millis()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("kv_put", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("kv_delete", e))?;
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("DELETE FROM kv_entries WHERE key = ? RETURNING value, expires_at")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("kv_take", e))?;

        Ok(row
            .filter(|(_, expires)| is_live(from_millis(*expires)))
            .map(|(value, _)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.put("a", "1", None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.put("a", "2", Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

        assert_eq!(store.take("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.take("a").await.unwrap(), None);

        store.put("b", "x", None).await.unwrap();
        store.delete("b").await.unwrap();
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    async fn expired_entries_read_as_absent(store: &dyn KvStore) {
        store.put("short", "v", Some(Duration::from_millis(20))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.take("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_store_semantics() {
        let store = InMemoryKvStore::new();
        exercise(&store).await;
        expired_entries_read_as_absent(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_semantics() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteKvStore::new(db.pool().clone());
        exercise(&store).await;
        expired_entries_read_as_absent(&store).await;
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteKvStore::new(db.pool().clone());
        store.put("old", "v", Some(Duration::from_millis(1))).await.unwrap();
        store.put("keep", "v", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.get("keep").await.unwrap().as_deref(), Some("v"));
    }
}
