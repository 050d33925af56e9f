use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_core::ServiceCategoryId;
use casebridge_journeys::{CategoryPatch, NewServiceCategory, ReorderPlan, ServiceCategory};

use super::parse_column;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const CATEGORY_COLUMNS: &str =
    "id, name, description, display_order, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ServiceCategoryStore {
    pool: SqlitePool,
}

impl ServiceCategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Categories in display order; inactive ones only when asked for.
    pub async fn list(&self, include_inactive: bool) -> StoreResult<Vec<ServiceCategory>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {CATEGORY_COLUMNS} FROM service_categories"));
        if !include_inactive {
            qb.push(" WHERE is_active = 1");
        }
        qb.push(" ORDER BY display_order, name");

        let rows: Vec<CategoryRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.into_iter().map(CategoryRow::into_category).collect()
    }

    pub async fn get(&self, id: ServiceCategoryId) -> StoreResult<ServiceCategory> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM service_categories WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;

        row.ok_or(StoreError::not_found::<ServiceCategory>())?
            .into_category()
    }

    /// Append a category at the end of the display order.
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create(&self, new: &NewServiceCategory) -> StoreResult<ServiceCategory> {
        let id = ServiceCategoryId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO service_categories (id, name, description, display_order, is_active, created_at, updated_at)
             SELECT ?, ?, ?, COALESCE(MAX(display_order), 0) + 1, 1, ?, ?
             FROM service_categories",
        )
        .bind(id.to_string())
        .bind(&new.name)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_category", e))?;

        self.get(id).await
    }

    #[instrument(skip(self, patch), fields(category_id = %id), err)]
    pub async fn update(
        &self,
        id: ServiceCategoryId,
        patch: &CategoryPatch,
    ) -> StoreResult<ServiceCategory> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE service_categories SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(active) = patch.is_active {
            qb.push(", is_active = ").push_bind(active);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<ServiceCategory>());
        }

        self.get(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: ServiceCategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM service_categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<ServiceCategory>());
        }
        Ok(())
    }

    /// Rewrite display positions in one transaction. An unknown id aborts the
    /// whole batch (the transaction rolls back on drop).
    #[instrument(skip(self, plan), fields(entries = plan.len()), err)]
    pub async fn reorder(
        &self,
        plan: &ReorderPlan<ServiceCategoryId>,
    ) -> StoreResult<Vec<ServiceCategory>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_reorder_categories", e))?;
        let now = Utc::now();

        for entry in plan.entries() {
            let result = sqlx::query(
                "UPDATE service_categories SET display_order = ?, updated_at = ? WHERE id = ?",
            )
            .bind(entry.position)
            .bind(now)
            .bind(entry.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reorder_categories", e))?;

            if result.rows_affected() == 0 {
                tracing::warn!(category_id = %entry.id, "reorder references unknown category");
                return Err(StoreError::not_found::<ServiceCategory>());
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_reorder_categories", e))?;

        self.list(true).await
    }
}

struct CategoryRow {
    id: String,
    name: String,
    description: Option<String>,
    display_order: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for CategoryRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            display_order: row.try_get("display_order")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl CategoryRow {
    fn into_category(self) -> StoreResult<ServiceCategory> {
        Ok(ServiceCategory {
            id: parse_column(&self.id, "service_categories.id")?,
            name: self.name,
            description: self.description,
            display_order: self.display_order,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
