use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_core::{JourneyId, JourneyStepId};
use casebridge_journeys::{
    Journey, JourneyPatch, JourneyStep, NewJourney, NewJourneyStep, ReorderPlan, StepPatch,
};

use super::{parse_column, parse_optional_column};
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const JOURNEY_SELECT: &str = "SELECT j.id, j.name, j.description, j.service_category_id,
        j.is_active, j.created_at, j.updated_at, c.name AS category_name
    FROM journeys j
    LEFT JOIN service_categories c ON c.id = j.service_category_id";

const STEP_COLUMNS: &str = "id, journey_id, name, description, step_order, created_at, updated_at";

/// Journey templates and their ordered steps.
#[derive(Debug, Clone)]
pub struct JourneyStore {
    pool: SqlitePool,
}

impl JourneyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Journey>> {
        let mut qb = QueryBuilder::<Sqlite>::new(JOURNEY_SELECT);
        if !include_inactive {
            qb.push(" WHERE j.is_active = 1");
        }
        qb.push(" ORDER BY j.name, j.id");

        let rows: Vec<JourneyRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_journeys", e))?;

        rows.into_iter().map(JourneyRow::into_journey).collect()
    }

    /// Journey by id regardless of its active flag; callers decide visibility.
    pub async fn get(&self, id: JourneyId) -> StoreResult<Journey> {
        let row: Option<JourneyRow> = sqlx::query_as(&format!("{JOURNEY_SELECT} WHERE j.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_journey", e))?;

        row.ok_or(StoreError::not_found::<Journey>())?.into_journey()
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create(&self, new: &NewJourney) -> StoreResult<Journey> {
        let id = JourneyId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO journeys (id, name, description, service_category_id, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.service_category_id.map(|c| c.to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_journey", e))?;

        self.get(id).await
    }

    #[instrument(skip(self, patch), fields(journey_id = %id), err)]
    pub async fn update(&self, id: JourneyId, patch: &JourneyPatch) -> StoreResult<Journey> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE journeys SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(category) = patch.service_category_id {
            qb.push(", service_category_id = ")
                .push_bind(category.map(|c| c.to_string()));
        }
        if let Some(active) = patch.is_active {
            qb.push(", is_active = ").push_bind(active);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_journey", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Journey>());
        }

        self.get(id).await
    }

    /// Soft delete. Steps are kept so the journey can be reactivated intact.
    #[instrument(skip(self), err)]
    pub async fn deactivate(&self, id: JourneyId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE journeys SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("deactivate_journey", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Journey>());
        }
        Ok(())
    }

    pub async fn steps(&self, journey: JourneyId) -> StoreResult<Vec<JourneyStep>> {
        let rows: Vec<StepRow> = sqlx::query_as(&format!(
            "SELECT {STEP_COLUMNS} FROM journey_steps WHERE journey_id = ? ORDER BY step_order, id"
        ))
        .bind(journey.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_steps", e))?;

        rows.into_iter().map(StepRow::into_step).collect()
    }

    pub async fn get_step(&self, id: JourneyStepId) -> StoreResult<JourneyStep> {
        let row: Option<StepRow> =
            sqlx::query_as(&format!("SELECT {STEP_COLUMNS} FROM journey_steps WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_step", e))?;

        row.ok_or(StoreError::not_found::<JourneyStep>())?.into_step()
    }

    /// Append a step after the journey's current last step.
    #[instrument(skip(self, new), fields(journey_id = %new.journey_id), err)]
    pub async fn add_step(&self, new: &NewJourneyStep) -> StoreResult<JourneyStep> {
        self.get(new.journey_id).await?;

        let id = JourneyStepId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO journey_steps (id, journey_id, name, description, step_order, created_at, updated_at)
             SELECT ?, ?, ?, ?, COALESCE(MAX(step_order), 0) + 1, ?, ?
             FROM journey_steps WHERE journey_id = ?",
        )
        .bind(id.to_string())
        .bind(new.journey_id.to_string())
        .bind(&new.name)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .bind(new.journey_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_step", e))?;

        self.get_step(id).await
    }

    #[instrument(skip(self, patch), fields(step_id = %id), err)]
    pub async fn update_step(&self, id: JourneyStepId, patch: &StepPatch) -> StoreResult<JourneyStep> {
        if patch.is_empty() {
            return self.get_step(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE journey_steps SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_step", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<JourneyStep>());
        }

        self.get_step(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_step(&self, id: JourneyStepId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM journey_steps WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_step", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<JourneyStep>());
        }
        Ok(())
    }

    /// Rewrite step positions of one journey in a single transaction. Every id
    /// must be a step of `journey`; otherwise nothing is written.
    #[instrument(skip(self, plan), fields(journey_id = %journey, entries = plan.len()), err)]
    pub async fn reorder_steps(
        &self,
        journey: JourneyId,
        plan: &ReorderPlan<JourneyStepId>,
    ) -> StoreResult<Vec<JourneyStep>> {
        self.get(journey).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_reorder_steps", e))?;
        let now = Utc::now();

        for entry in plan.entries() {
            let result = sqlx::query(
                "UPDATE journey_steps SET step_order = ?, updated_at = ?
                 WHERE id = ? AND journey_id = ?",
            )
            .bind(entry.position)
            .bind(now)
            .bind(entry.id.to_string())
            .bind(journey.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reorder_steps", e))?;

            if result.rows_affected() == 0 {
                tracing::warn!(step_id = %entry.id, "reorder references a step outside the journey");
                return Err(StoreError::not_found::<JourneyStep>());
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_reorder_steps", e))?;

        self.steps(journey).await
    }
}

struct JourneyRow {
    id: String,
    name: String,
    description: Option<String>,
    service_category_id: Option<String>,
    category_name: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for JourneyRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            service_category_id: row.try_get("service_category_id")?,
            category_name: row.try_get("category_name")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl JourneyRow {
    fn into_journey(self) -> StoreResult<Journey> {
        Ok(Journey {
            id: parse_column(&self.id, "journeys.id")?,
            name: self.name,
            description: self.description,
            service_category_id: parse_optional_column(
                self.service_category_id,
                "journeys.service_category_id",
            )?,
            category_name: self.category_name,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct StepRow {
    id: String,
    journey_id: String,
    name: String,
    description: Option<String>,
    step_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for StepRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            journey_id: row.try_get("journey_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            step_order: row.try_get("step_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StepRow {
    fn into_step(self) -> StoreResult<JourneyStep> {
        Ok(JourneyStep {
            id: parse_column(&self.id, "journey_steps.id")?,
            journey_id: parse_column(&self.journey_id, "journey_steps.journey_id")?,
            name: self.name,
            description: self.description,
            step_order: self.step_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
