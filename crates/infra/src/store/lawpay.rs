use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};
use tracing::instrument;

use casebridge_billing::LawPayConnection;

use super::parse_column;
use crate::error::{StoreResult, map_sqlx_error};

/// The firm's single LawPay merchant connection (row `id = 1`).
#[derive(Debug, Clone)]
pub struct LawPayStore {
    pool: SqlitePool,
}

impl LawPayStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> StoreResult<Option<LawPayConnection>> {
        let row: Option<ConnectionRow> = sqlx::query_as(
            "SELECT access_token, refresh_token, token_type, scope, merchant_id, connected_by, connected_at
             FROM lawpay_connection WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_lawpay_connection", e))?;

        row.map(ConnectionRow::into_connection).transpose()
    }

    /// Store the connection, replacing any previous one.
    #[instrument(skip(self, conn), fields(merchant_id = ?conn.merchant_id), err)]
    pub async fn save(&self, conn: &LawPayConnection) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO lawpay_connection (id, access_token, refresh_token, token_type, scope, merchant_id, connected_by, connected_at)
             VALUES (1, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                scope = excluded.scope,
                merchant_id = excluded.merchant_id,
                connected_by = excluded.connected_by,
                connected_at = excluded.connected_at",
        )
        .bind(&conn.access_token)
        .bind(&conn.refresh_token)
        .bind(&conn.token_type)
        .bind(&conn.scope)
        .bind(&conn.merchant_id)
        .bind(conn.connected_by.to_string())
        .bind(conn.connected_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_lawpay_connection", e))?;

        Ok(())
    }

    /// Returns whether a connection existed.
    #[instrument(skip(self), err)]
    pub async fn delete(&self) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM lawpay_connection WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_lawpay_connection", e))?;
        Ok(result.rows_affected() > 0)
    }
}

struct ConnectionRow {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    scope: Option<String>,
    merchant_id: Option<String>,
    connected_by: String,
    connected_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ConnectionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            token_type: row.try_get("token_type")?,
            scope: row.try_get("scope")?,
            merchant_id: row.try_get("merchant_id")?,
            connected_by: row.try_get("connected_by")?,
            connected_at: row.try_get("connected_at")?,
        })
    }
}

impl ConnectionRow {
    fn into_connection(self) -> StoreResult<LawPayConnection> {
        Ok(LawPayConnection {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            scope: self.scope,
            merchant_id: self.merchant_id,
            connected_by: parse_column(&self.connected_by, "lawpay_connection.connected_by")?,
            connected_at: self.connected_at,
        })
    }
}
