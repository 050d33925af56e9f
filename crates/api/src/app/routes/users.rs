use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};

use casebridge_auth::{NewUser, Role, UserPatch, ADMIN_ONLY, STAFF};
use casebridge_core::UserId;

use crate::app::dto::{self, UserListQuery, UserRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// Lawyers may only browse the client directory.
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let Query(query) = query?;

    let mut role = query.role.as_deref().map(str::parse::<Role>).transpose()?;
    if current.role() == Role::Lawyer {
        match role {
            None => role = Some(Role::Client),
            Some(Role::Client) => {}
            Some(_) => return Err(ApiError::Forbidden("lawyers may only list clients".into())),
        }
    }

    let users = state.db.users().list(role).await?;
    dto::envelope("users", &users)
}

pub async fn create_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Json(body) = body?;

    let new = NewUser::new(
        body.email.as_deref(),
        body.password.as_deref(),
        body.role.as_deref(),
        body.first_name.as_deref(),
        body.last_name.as_deref(),
        body.phone.as_deref(),
    )?;
    let user = state.db.users().create(&new).await?;

    tracing::info!(user_id = %user.id, role = %user.role, by = %current.id(), "user created");
    dto::mutated(StatusCode::CREATED, "user", &user)
}

pub async fn get_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: UserId = dto::parse_id(&id)?;
    if id != current.id() {
        authz::require(&current, STAFF)?;
    }

    let user = state.db.users().get(id).await?;
    dto::envelope("user", &user)
}

pub async fn update_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: UserId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = UserPatch::new(
        body.email.as_deref(),
        body.password.as_deref(),
        body.role.as_deref(),
        body.first_name.as_deref(),
        body.last_name.as_deref(),
        body.phone.as_deref(),
    )?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }
    if id == current.id() && patch.role.is_some_and(|r| r != Role::Admin) {
        return Err(ApiError::validation("you cannot remove your own admin role"));
    }

    let user = state.db.users().update(id, &patch).await?;
    tracing::info!(user_id = %user.id, by = %current.id(), "user updated");
    dto::mutated(StatusCode::OK, "user", &user)
}

pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: UserId = dto::parse_id(&id)?;
    if id == current.id() {
        return Err(ApiError::validation("you cannot delete your own account"));
    }

    state.db.users().delete(id).await?;
    tracing::info!(user_id = %id, by = %current.id(), "user deleted");
    dto::success()
}
