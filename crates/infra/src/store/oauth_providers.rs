use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_core::OAuthProviderId;
use casebridge_integrations::{NewOAuthProvider, OAuthProvider, OAuthProviderPatch, PublicProvider};

use super::parse_column;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const PROVIDER_COLUMNS: &str =
    "id, provider_id, name, client_id, client_secret, scopes, is_enabled, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct OAuthProviderStore {
    pool: SqlitePool,
}

impl OAuthProviderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> StoreResult<Vec<OAuthProvider>> {
        let rows: Vec<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM oauth_providers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_oauth_providers", e))?;

        rows.into_iter().map(ProviderRow::into_provider).collect()
    }

    /// Enabled providers, stripped to what a login screen may show.
    pub async fn list_enabled(&self) -> StoreResult<Vec<PublicProvider>> {
        let rows: Vec<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM oauth_providers WHERE is_enabled = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_enabled_oauth_providers", e))?;

        rows.into_iter()
            .map(|row| row.into_provider().map(|p| PublicProvider::from(&p)))
            .collect()
    }

    pub async fn get(&self, id: OAuthProviderId) -> StoreResult<OAuthProvider> {
        let row: Option<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM oauth_providers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_oauth_provider", e))?;

        row.ok_or(StoreError::not_found::<OAuthProvider>())?
            .into_provider()
    }

    #[instrument(skip(self, new), fields(provider_id = %new.provider_id), err)]
    pub async fn create(&self, new: &NewOAuthProvider) -> StoreResult<OAuthProvider> {
        let id = OAuthProviderId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO oauth_providers (id, provider_id, name, client_id, client_secret, scopes, is_enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&new.provider_id)
        .bind(&new.name)
        .bind(&new.client_id)
        .bind(&new.client_secret)
        .bind(encode_scopes(&new.scopes)?)
        .bind(new.is_enabled)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_oauth_provider", e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!(
                "provider '{}' is already configured",
                new.provider_id
            )),
            other => other,
        })?;

        self.get(id).await
    }

    #[instrument(skip(self, patch), fields(id = %id), err)]
    pub async fn update(
        &self,
        id: OAuthProviderId,
        patch: &OAuthProviderPatch,
    ) -> StoreResult<OAuthProvider> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE oauth_providers SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(client_id) = &patch.client_id {
            qb.push(", client_id = ").push_bind(client_id.clone());
        }
        if let Some(secret) = &patch.client_secret {
            qb.push(", client_secret = ").push_bind(secret.clone());
        }
        if let Some(scopes) = &patch.scopes {
            qb.push(", scopes = ").push_bind(encode_scopes(scopes)?);
        }
        if let Some(enabled) = patch.is_enabled {
            qb.push(", is_enabled = ").push_bind(enabled);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_oauth_provider", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<OAuthProvider>());
        }

        self.get(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: OAuthProviderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM oauth_providers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_oauth_provider", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<OAuthProvider>());
        }
        Ok(())
    }
}

/// Scopes are kept as a JSON array in a TEXT column.
fn encode_scopes(scopes: &[String]) -> StoreResult<String> {
    serde_json::to_string(scopes).map_err(|e| StoreError::corrupt(format!("scopes: {e}")))
}

struct ProviderRow {
    id: String,
    provider_id: String,
    name: String,
    client_id: String,
    client_secret: String,
    scopes: String,
    is_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ProviderRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            provider_id: row.try_get("provider_id")?,
            name: row.try_get("name")?,
            client_id: row.try_get("client_id")?,
            client_secret: row.try_get("client_secret")?,
            scopes: row.try_get("scopes")?,
            is_enabled: row.try_get("is_enabled")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ProviderRow {
    fn into_provider(self) -> StoreResult<OAuthProvider> {
        let scopes: Vec<String> = serde_json::from_str(&self.scopes)
            .map_err(|e| StoreError::corrupt(format!("oauth_providers.scopes: {e}")))?;

        Ok(OAuthProvider {
            id: parse_column(&self.id, "oauth_providers.id")?,
            provider_id: self.provider_id,
            name: self.name,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scopes,
            is_enabled: self.is_enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
