use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use casebridge_auth::STAFF;
use casebridge_core::{JourneyId, JourneyStepId};
use casebridge_journeys::{
    JourneyPatch, NewJourney, NewJourneyStep, ReorderEntry, ReorderPlan, StepPatch,
};

use crate::app::dto::{self, IncludeInactive, JourneyRequest, ReorderStepsRequest, StepRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_journeys).post(create_journey))
        .route(
            "/:id",
            get(get_journey).put(update_journey).delete(delete_journey),
        )
        .route("/:id/steps", post(add_step))
        .route("/:id/steps/reorder", put(reorder_steps))
}

/// Mounted at `/journey-steps`.
pub fn steps_router() -> Router {
    Router::new().route("/:id", put(update_step).delete(delete_step))
}

pub async fn list_journeys(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<IncludeInactive>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let include_inactive = authz::may_include_inactive(&current, query.include_inactive, STAFF);

    let journeys = state.db.journeys().list(include_inactive).await?;
    dto::envelope("journeys", &journeys)
}

pub async fn create_journey(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<JourneyRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let Json(body) = body?;

    let new = NewJourney::new(
        body.name.as_deref(),
        body.description.as_deref(),
        body.service_category_id.as_deref(),
    )?;
    let journey = state.db.journeys().create(&new).await?;

    tracing::info!(journey_id = %journey.id, by = %current.id(), "journey created");
    dto::mutated(StatusCode::CREATED, "journey", &journey)
}

/// Journey with its ordered steps. Deactivated journeys are hidden from clients.
pub async fn get_journey(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: JourneyId = dto::parse_id(&id)?;
    let journey = state.db.journeys().get(id).await?;
    if !journey.is_active && !current.role().is_staff() {
        return Err(ApiError::not_found("journey"));
    }

    let steps = state.db.journeys().steps(id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "journey": journey, "steps": steps })),
    )
        .into_response())
}

pub async fn update_journey(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<JourneyRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = JourneyPatch::new(
        body.name.as_deref(),
        body.description.as_deref(),
        body.service_category_id.as_deref(),
        body.is_active,
    )?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let journey = state.db.journeys().update(id, &patch).await?;
    tracing::info!(journey_id = %journey.id, is_active = journey.is_active, by = %current.id(), "journey updated");
    dto::mutated(StatusCode::OK, "journey", &journey)
}

/// Soft delete (`is_active = false`); steps are kept for reactivation.
pub async fn delete_journey(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyId = dto::parse_id(&id)?;

    state.db.journeys().deactivate(id).await?;
    tracing::info!(journey_id = %id, by = %current.id(), "journey deactivated");
    dto::success()
}

pub async fn add_step(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<StepRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let new = NewJourneyStep::new(id, body.name.as_deref(), body.description.as_deref())?;
    let step = state.db.journeys().add_step(&new).await?;

    tracing::info!(journey_id = %id, step_id = %step.id, step_order = step.step_order, "journey step added");
    dto::mutated(StatusCode::CREATED, "step", &step)
}

pub async fn reorder_steps(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<ReorderStepsRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let entries = body
        .steps
        .ok_or_else(|| ApiError::validation("steps is required"))?
        .into_iter()
        .map(|s| {
            dto::parse_id::<JourneyStepId>(&s.id).map(|id| ReorderEntry {
                id,
                position: s.step_order,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    let plan = ReorderPlan::new(entries)?;

    let steps = state.db.journeys().reorder_steps(id, &plan).await?;
    tracing::info!(journey_id = %id, entries = plan.len(), by = %current.id(), "journey steps reordered");
    dto::mutated(StatusCode::OK, "steps", &steps)
}

pub async fn update_step(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<StepRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyStepId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = StepPatch::new(body.name.as_deref(), body.description.as_deref())?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let step = state.db.journeys().update_step(id, &patch).await?;
    dto::mutated(StatusCode::OK, "step", &step)
}

pub async fn delete_step(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: JourneyStepId = dto::parse_id(&id)?;

    state.db.journeys().delete_step(id).await?;
    tracing::info!(step_id = %id, by = %current.id(), "journey step deleted");
    dto::success()
}
