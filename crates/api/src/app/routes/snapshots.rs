use axum::{
    extract::{Extension, Path},
    routing::get,
    Router,
};

use casebridge_auth::STAFF;
use casebridge_core::SnapshotId;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new().route("/:id", get(get_snapshot).delete(delete_snapshot))
}

pub async fn get_snapshot(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: SnapshotId = dto::parse_id(&id)?;
    let snapshot = state.db.snapshots().get(id).await?;
    dto::envelope("snapshot", &snapshot)
}

/// Soft delete: the version number stays taken.
pub async fn delete_snapshot(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: SnapshotId = dto::parse_id(&id)?;

    state.db.snapshots().delete(id).await?;
    tracing::info!(snapshot_id = %id, by = %current.id(), "snapshot deleted");
    dto::success()
}
