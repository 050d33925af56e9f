use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use casebridge_auth::ADMIN_ONLY;
use casebridge_core::ServiceCategoryId;
use casebridge_journeys::{CategoryPatch, NewServiceCategory, ReorderEntry, ReorderPlan};

use crate::app::dto::{self, CategoryRequest, IncludeInactive, ReorderCategoriesRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/reorder", put(reorder_categories))
        .route("/:id", put(update_category).delete(delete_category))
}

pub async fn list_categories(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<IncludeInactive>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let include_inactive = authz::may_include_inactive(&current, query.include_inactive, ADMIN_ONLY);

    let categories = state.db.categories().list(include_inactive).await?;
    dto::envelope("categories", &categories)
}

pub async fn create_category(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Json(body) = body?;

    let new = NewServiceCategory::new(body.name.as_deref(), body.description.as_deref())?;
    let category = state.db.categories().create(&new).await?;

    tracing::info!(category_id = %category.id, display_order = category.display_order, "service category created");
    dto::mutated(StatusCode::CREATED, "category", &category)
}

pub async fn update_category(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: ServiceCategoryId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = CategoryPatch::new(body.name.as_deref(), body.description.as_deref(), body.is_active)?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let category = state.db.categories().update(id, &patch).await?;
    tracing::info!(category_id = %category.id, "service category updated");
    dto::mutated(StatusCode::OK, "category", &category)
}

pub async fn delete_category(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: ServiceCategoryId = dto::parse_id(&id)?;

    state.db.categories().delete(id).await?;
    tracing::info!(category_id = %id, "service category deleted");
    dto::success()
}

/// Rewrite every listed category's `display_order` in one transaction.
pub async fn reorder_categories(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<ReorderCategoriesRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Json(body) = body?;

    let entries = body
        .categories
        .ok_or_else(|| ApiError::validation("categories is required"))?
        .into_iter()
        .map(|c| {
            dto::parse_id::<ServiceCategoryId>(&c.id).map(|id| ReorderEntry {
                id,
                position: c.display_order,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    let plan = ReorderPlan::new(entries)?;

    let categories = state.db.categories().reorder(&plan).await?;
    tracing::info!(entries = plan.len(), by = %current.id(), "service categories reordered");
    dto::mutated(StatusCode::OK, "categories", &categories)
}
