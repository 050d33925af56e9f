use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use casebridge_auth::ADMIN_ONLY;
use casebridge_core::OAuthProviderId;
use casebridge_integrations::{NewOAuthProvider, OAuthProviderPatch};

use crate::app::dto::{self, OAuthProviderRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_providers).post(create_provider))
        .route("/:id", put(update_provider).delete(delete_provider))
}

/// Public: what the login screen may show. No credentials.
pub async fn list_enabled(Extension(state): Extension<AppState>) -> ApiResult {
    let providers = state.db.oauth_providers().list_enabled().await?;
    dto::envelope("providers", &providers)
}

pub async fn list_providers(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let providers = state.db.oauth_providers().list().await?;
    dto::envelope("providers", &providers)
}

pub async fn create_provider(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<OAuthProviderRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Json(body) = body?;

    let new = NewOAuthProvider::new(
        body.provider_id.as_deref(),
        body.name.as_deref(),
        body.client_id.as_deref(),
        body.client_secret.as_deref(),
        body.scopes.as_deref(),
        body.is_enabled,
    )?;
    let provider = state.db.oauth_providers().create(&new).await?;

    tracing::info!(provider = %provider.provider_id, enabled = provider.is_enabled, "oauth provider created");
    dto::mutated(StatusCode::CREATED, "provider", &provider)
}

pub async fn update_provider(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<OAuthProviderRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: OAuthProviderId = dto::parse_id(&id)?;
    let Json(body) = body?;

    if body.provider_id.is_some() {
        return Err(ApiError::validation("provider_id cannot be changed"));
    }
    let patch = OAuthProviderPatch::new(
        body.name.as_deref(),
        body.client_id.as_deref(),
        body.client_secret.as_deref(),
        body.scopes.as_deref(),
        body.is_enabled,
    )?;
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let provider = state.db.oauth_providers().update(id, &patch).await?;
    tracing::info!(provider = %provider.provider_id, enabled = provider.is_enabled, "oauth provider updated");
    dto::mutated(StatusCode::OK, "provider", &provider)
}

pub async fn delete_provider(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let id: OAuthProviderId = dto::parse_id(&id)?;

    state.db.oauth_providers().delete(id).await?;
    tracing::info!(provider_id = %id, "oauth provider deleted");
    dto::success()
}
