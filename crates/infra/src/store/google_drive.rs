use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};
use tracing::instrument;

use casebridge_integrations::GoogleDriveConfig;

use crate::error::{StoreResult, map_sqlx_error};

/// Singleton Google Drive configuration (row `id = 1`).
#[derive(Debug, Clone)]
pub struct GoogleDriveStore {
    pool: SqlitePool,
}

impl GoogleDriveStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> StoreResult<Option<GoogleDriveConfig>> {
        let row: Option<DriveRow> = sqlx::query_as(
            "SELECT is_enabled, service_account_email, service_account_key, root_folder_id,
                    shared_drive_id, updated_at
             FROM google_drive_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_google_drive_config", e))?;

        Ok(row.map(DriveRow::into_config))
    }

    #[instrument(skip(self, config), fields(enabled = config.is_enabled), err)]
    pub async fn save(&self, config: &GoogleDriveConfig) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO google_drive_config (id, is_enabled, service_account_email, service_account_key, root_folder_id, shared_drive_id, updated_at)
             VALUES (1, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                is_enabled = excluded.is_enabled,
                service_account_email = excluded.service_account_email,
                service_account_key = excluded.service_account_key,
                root_folder_id = excluded.root_folder_id,
                shared_drive_id = excluded.shared_drive_id,
                updated_at = excluded.updated_at",
        )
        .bind(config.is_enabled)
        .bind(&config.service_account_email)
        .bind(&config.service_account_key)
        .bind(&config.root_folder_id)
        .bind(&config.shared_drive_id)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_google_drive_config", e))?;

        Ok(())
    }

    /// Returns whether a config existed.
    #[instrument(skip(self), err)]
    pub async fn delete(&self) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM google_drive_config WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_google_drive_config", e))?;
        Ok(result.rows_affected() > 0)
    }
}

struct DriveRow {
    is_enabled: bool,
    service_account_email: Option<String>,
    service_account_key: Option<String>,
    root_folder_id: Option<String>,
    shared_drive_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for DriveRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            is_enabled: row.try_get("is_enabled")?,
            service_account_email: row.try_get("service_account_email")?,
            service_account_key: row.try_get("service_account_key")?,
            root_folder_id: row.try_get("root_folder_id")?,
            shared_drive_id: row.try_get("shared_drive_id")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl DriveRow {
    fn into_config(self) -> GoogleDriveConfig {
        GoogleDriveConfig {
            is_enabled: self.is_enabled,
            service_account_email: self.service_account_email,
            service_account_key: self.service_account_key,
            root_folder_id: self.root_folder_id,
            shared_drive_id: self.shared_drive_id,
            updated_at: self.updated_at,
        }
    }
}
