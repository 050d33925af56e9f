//! SQLite connection pool and migration runner.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::error::{StoreResult, map_sqlx_error};
use crate::schema::MIGRATIONS;
use crate::store::{
    ConversationStore, DocumentStore, GoogleDriveStore, JourneyStore, LawPayStore, MatterStore,
    OAuthProviderStore, PaymentStore, ServiceCategoryStore, SnapshotStore, UserStore,
};

/// Handle to the application database. Cheap to clone (the pool is shared).
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `url` and apply migrations.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database (tests, demos). A single connection keeps
    /// every query on the same memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every migration newer than the recorded schema version.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_schema_migrations", e))?;

        let current: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("schema_version", e))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("begin_migration", e))?;

            sqlx::raw_sql(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply_migration", e))?;

            sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
                .bind(migration.version)
                .bind(migration.name)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("record_migration", e))?;

            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("commit_migration", e))?;

            tracing::info!(version = migration.version, name = migration.name, "applied migration");
        }

        Ok(())
    }

    pub async fn schema_version(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("schema_version", e))
    }

    /// Liveness probe used by `/health`.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn matters(&self) -> MatterStore {
        MatterStore::new(self.pool.clone())
    }

    pub fn documents(&self) -> DocumentStore {
        DocumentStore::new(self.pool.clone())
    }

    pub fn snapshots(&self) -> SnapshotStore {
        SnapshotStore::new(self.pool.clone())
    }

    pub fn categories(&self) -> ServiceCategoryStore {
        ServiceCategoryStore::new(self.pool.clone())
    }

    pub fn journeys(&self) -> JourneyStore {
        JourneyStore::new(self.pool.clone())
    }

    pub fn oauth_providers(&self) -> OAuthProviderStore {
        OAuthProviderStore::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentStore {
        PaymentStore::new(self.pool.clone())
    }

    pub fn lawpay(&self) -> LawPayStore {
        LawPayStore::new(self.pool.clone())
    }

    pub fn google_drive(&self) -> GoogleDriveStore {
        GoogleDriveStore::new(self.pool.clone())
    }

    pub fn conversations(&self) -> ConversationStore {
        ConversationStore::new(self.pool.clone())
    }
}
