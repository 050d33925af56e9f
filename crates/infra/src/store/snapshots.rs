use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};
use tracing::instrument;

use casebridge_core::{DocumentId, SnapshotId};
use casebridge_matters::{NewSnapshot, Snapshot};

use super::{parse_column, parse_optional_column};
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const SNAPSHOT_COLUMNS: &str =
    "id, document_id, version, content, note, status, created_by, created_at";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Active snapshots of a document, newest version first.
    pub async fn list_for_document(&self, document: DocumentId) -> StoreResult<Vec<Snapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshot_versions
             WHERE document_id = ? AND status = 'ACTIVE'
             ORDER BY version DESC"
        ))
        .bind(document.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_snapshots", e))?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    /// Active snapshot by id; deleted snapshots read as missing.
    pub async fn get(&self, id: SnapshotId) -> StoreResult<Snapshot> {
        let row: Option<SnapshotRow> = sqlx::query_as(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshot_versions WHERE id = ? AND status = 'ACTIVE'"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_snapshot", e))?;

        row.ok_or(StoreError::not_found::<Snapshot>())?.into_snapshot()
    }

    /// Record a new version. The number is allocated in the INSERT itself as one
    /// past the highest version ever taken for the document, deleted ones included.
    #[instrument(skip(self, new), fields(document_id = %new.document_id), err)]
    pub async fn create(&self, new: &NewSnapshot) -> StoreResult<Snapshot> {
        let id = SnapshotId::new();
        let now = Utc::now();

        let version: i64 = sqlx::query_scalar(
            "INSERT INTO snapshot_versions (id, document_id, version, content, note, status, created_by, created_at)
             SELECT ?, ?, COALESCE(MAX(version), 0) + 1, ?, ?, 'ACTIVE', ?, ?
             FROM snapshot_versions WHERE document_id = ?
             RETURNING version",
        )
        .bind(id.to_string())
        .bind(new.document_id.to_string())
        .bind(&new.content)
        .bind(&new.note)
        .bind(new.created_by.map(|u| u.to_string()))
        .bind(now)
        .bind(new.document_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_snapshot", e))?;

        tracing::debug!(snapshot_id = %id, version, "snapshot recorded");
        self.get(id).await
    }

    /// Soft delete: the row stays so its version number is never reused.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: SnapshotId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE snapshot_versions SET status = 'DELETED' WHERE id = ? AND status = 'ACTIVE'",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_snapshot", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Snapshot>());
        }
        Ok(())
    }
}

struct SnapshotRow {
    id: String,
    document_id: String,
    version: i64,
    content: String,
    note: Option<String>,
    status: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for SnapshotRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            document_id: row.try_get("document_id")?,
            version: row.try_get("version")?,
            content: row.try_get("content")?,
            note: row.try_get("note")?,
            status: row.try_get("status")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl SnapshotRow {
    fn into_snapshot(self) -> StoreResult<Snapshot> {
        Ok(Snapshot {
            id: parse_column(&self.id, "snapshot_versions.id")?,
            document_id: parse_column(&self.document_id, "snapshot_versions.document_id")?,
            version: self.version,
            content: self.content,
            note: self.note,
            status: parse_column(&self.status, "snapshot_versions.status")?,
            created_by: parse_optional_column(self.created_by, "snapshot_versions.created_by")?,
            created_at: self.created_at,
        })
    }
}
