use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};

use casebridge_auth::STAFF;
use casebridge_core::{DocumentId, MatterId};
use casebridge_matters::{DocumentPatch, NewDocument, NewSnapshot};

use crate::app::dto::{
    self, CreateDocumentRequest, CreateSnapshotRequest, MatterFilter, UpdateDocumentRequest,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_documents).post(create_document))
        .route(
            "/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/:id/snapshots", get(list_snapshots).post(create_snapshot))
}

pub async fn list_documents(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<MatterFilter>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let matter = query
        .matter_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(dto::parse_id::<MatterId>)
        .transpose()?;

    let documents = state
        .db
        .documents()
        .list(matter, authz::client_scope(&current))
        .await?;
    dto::envelope("documents", &documents)
}

pub async fn create_document(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let Json(body) = body?;

    let new = NewDocument::new(
        body.matter_id.as_deref(),
        body.title.as_deref(),
        body.description.as_deref(),
        body.content.as_deref(),
    )?;
    let document = state.db.documents().create(&new).await?;

    tracing::info!(document_id = %document.id, matter_id = %document.matter_id, by = %current.id(), "document created");
    dto::mutated(StatusCode::CREATED, "document", &document)
}

pub async fn get_document(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: DocumentId = dto::parse_id(&id)?;
    let document = state.db.documents().get(id).await?;
    authz::require_owner(&current, document.client_id)?;
    dto::envelope("document", &document)
}

pub async fn update_document(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateDocumentRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: DocumentId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let patch = DocumentPatch::new(
        body.title.as_deref(),
        body.description.as_deref(),
        body.content.as_deref(),
        body.status.as_deref(),
    )?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let document = state.db.documents().update(id, &patch).await?;
    tracing::info!(document_id = %document.id, status = %document.status, by = %current.id(), "document updated");
    dto::mutated(StatusCode::OK, "document", &document)
}

pub async fn delete_document(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: DocumentId = dto::parse_id(&id)?;

    state.db.documents().delete(id).await?;
    tracing::info!(document_id = %id, by = %current.id(), "document deleted");
    dto::success()
}

pub async fn list_snapshots(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: DocumentId = dto::parse_id(&id)?;

    // 404 for an unknown document rather than an empty list.
    state.db.documents().get(id).await?;
    let snapshots = state.db.snapshots().list_for_document(id).await?;
    dto::envelope("snapshots", &snapshots)
}

/// Capture a new version. Without `content` the document's current body is
/// snapshotted.
pub async fn create_snapshot(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<CreateSnapshotRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: DocumentId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let document = state.db.documents().get(id).await?;
    let new = NewSnapshot::new(
        document.id,
        body.content.as_deref(),
        document.content.as_deref(),
        body.note.as_deref(),
        Some(current.id()),
    )?;
    let snapshot = state.db.snapshots().create(&new).await?;

    tracing::info!(
        snapshot_id = %snapshot.id,
        document_id = %snapshot.document_id,
        version = snapshot.version,
        by = %current.id(),
        "snapshot created"
    );
    dto::mutated(StatusCode::CREATED, "snapshot", &snapshot)
}
