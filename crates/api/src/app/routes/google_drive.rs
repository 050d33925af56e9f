use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use casebridge_auth::ADMIN_ONLY;
use casebridge_integrations::DriveConfigUpdate;

use crate::app::dto::{self, GoogleDriveRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new().route(
        "/config",
        get(get_config).put(save_config).delete(delete_config),
    )
}

/// `{ "config": null }` until an admin saves one.
pub async fn get_config(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let config = state.db.google_drive().get().await?;
    dto::envelope("config", &config)
}

/// Merge the request over the stored config and save it.
pub async fn save_config(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<GoogleDriveRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Json(body) = body?;

    let update = DriveConfigUpdate::new(
        body.is_enabled,
        body.service_account_email.as_deref(),
        body.service_account_key.as_deref(),
        body.root_folder_id.as_deref(),
        body.shared_drive_id.as_deref(),
    )?;
    if update.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }
    let store = state.db.google_drive();
    let current_config = store.get().await?;
    let config = update.apply(current_config.as_ref(), Utc::now())?;
    store.save(&config).await?;

    tracing::info!(enabled = config.is_enabled, by = %current.id(), "Google Drive config saved");
    dto::mutated(StatusCode::OK, "config", &config)
}

pub async fn delete_config(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    if !state.db.google_drive().delete().await? {
        return Err(ApiError::not_found("Google Drive config"));
    }

    tracing::info!(by = %current.id(), "Google Drive config removed");
    dto::success()
}
