//! Client/lawyer bridge conversations.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use casebridge_auth::{Role, STAFF};
use casebridge_core::{ConversationId, UserId, required_text};
use casebridge_infra::ConversationScope;
use casebridge_matters::NewConversation;

use crate::app::dto::{self, CreateConversationRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:id",
            get(get_conversation).delete(archive_conversation),
        )
}

fn scope_for(current: &CurrentUser) -> ConversationScope {
    match current.role() {
        Role::Client => ConversationScope::Client(current.id()),
        Role::Lawyer => ConversationScope::Lawyer(current.id()),
        Role::Admin => ConversationScope::All,
    }
}

pub async fn list_conversations(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    let conversations = state.db.conversations().list(scope_for(&current)).await?;
    dto::envelope("conversations", &conversations)
}

/// Clients open threads for themselves; staff must name the client.
pub async fn create_conversation(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;

    let client_id = if current.role() == Role::Client {
        if let Some(requested) = body.client_id.as_deref().filter(|s| !s.trim().is_empty()) {
            authz::require_owner(&current, dto::parse_id::<UserId>(requested)?)?;
        }
        current.id()
    } else {
        dto::parse_id(&required_text(body.client_id.as_deref(), "client_id")?)?
    };

    let new = NewConversation::new(
        client_id,
        body.subject.as_deref(),
        body.lawyer_id.as_deref(),
        body.matter_id.as_deref(),
    )?;
    if let Some(matter_id) = new.matter_id {
        let matter = state.db.matters().get(matter_id).await?;
        if matter.client_id != client_id {
            return Err(ApiError::validation(
                "matter_id refers to another client's matter",
            ));
        }
    }
    let conversation = state.db.conversations().create(&new).await?;

    tracing::info!(conversation_id = %conversation.id, client_id = %client_id, by = %current.id(), "conversation opened");
    dto::mutated(StatusCode::CREATED, "conversation", &conversation)
}

pub async fn get_conversation(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ConversationId = dto::parse_id(&id)?;
    let conversation = state.db.conversations().get(id).await?;
    authz::require_owner(&current, conversation.client_id)?;
    dto::envelope("conversation", &conversation)
}

/// Soft delete: the thread is archived and drops out of listings.
pub async fn archive_conversation(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: ConversationId = dto::parse_id(&id)?;

    state.db.conversations().archive(id).await?;
    tracing::info!(conversation_id = %id, by = %current.id(), "conversation archived");
    dto::success()
}
