use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use casebridge_auth::STAFF;
use casebridge_core::MatterId;
use casebridge_matters::{MatterPatch, NewMatter};

use crate::app::dto::{self, CreateMatterRequest, UpdateMatterRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_matters).post(create_matter))
        .route("/:id", get(get_matter).put(update_matter).delete(delete_matter))
}

pub async fn list_matters(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    let matters = state.db.matters().list(authz::client_scope(&current)).await?;
    dto::envelope("matters", &matters)
}

pub async fn create_matter(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CreateMatterRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let Json(body) = body?;

    let new = NewMatter::new(
        body.client_id.as_deref(),
        body.title.as_deref(),
        body.lead_lawyer_id.as_deref(),
        body.matter_number.as_deref(),
        body.description.as_deref(),
        body.status.as_deref(),
    )?;
    let matter = state.db.matters().create(&new).await?;

    tracing::info!(matter_id = %matter.id, client_id = %matter.client_id, by = %current.id(), "matter created");
    dto::mutated(StatusCode::CREATED, "matter", &matter)
}

pub async fn get_matter(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MatterId = dto::parse_id(&id)?;
    let matter = state.db.matters().get(id).await?;
    authz::require_owner(&current, matter.client_id)?;
    dto::envelope("matter", &matter)
}

pub async fn update_matter(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateMatterRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: MatterId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = MatterPatch::new(
        body.title.as_deref(),
        body.lead_lawyer_id.as_deref(),
        body.matter_number.as_deref(),
        body.description.as_deref(),
        body.status.as_deref(),
    )?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let matter = state.db.matters().update(id, &patch).await?;
    tracing::info!(matter_id = %matter.id, status = %matter.status, by = %current.id(), "matter updated");
    dto::mutated(StatusCode::OK, "matter", &matter)
}

pub async fn delete_matter(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: MatterId = dto::parse_id(&id)?;

    state.db.matters().delete(id).await?;
    tracing::info!(matter_id = %id, by = %current.id(), "matter deleted");
    dto::success()
}
