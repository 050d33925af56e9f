//! LawPay merchant connection (admin-only OAuth redirect flow).

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use casebridge_auth::ADMIN_ONLY;
use casebridge_billing::{LawPayConnection, LawPayError};
use casebridge_core::required_text;

use crate::app::dto::{self, LawPayCallbackQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
        .route("/status", get(status))
        .route("/connection", delete(disconnect))
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Start the flow: mint a one-time `state` and send the browser to LawPay.
pub async fn connect(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    if !state.lawpay.config().is_configured() {
        return Err(LawPayError::NotConfigured.into());
    }

    let oauth_state = state.lawpay_states.issue(current.id()).await?;
    let url = state.lawpay.authorization_url(&oauth_state)?;

    tracing::info!(user_id = %current.id(), "LawPay connect started");
    Ok(redirect(&url))
}

pub async fn callback(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<LawPayCallbackQuery>, QueryRejection>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let Query(query) = query?;

    if let Some(error) = query.error.as_deref() {
        return Err(ApiError::validation(format!(
            "LawPay authorization was not granted: {error}"
        )));
    }
    let code = required_text(query.code.as_deref(), "code")?;
    let oauth_state = required_text(query.state.as_deref(), "state")?;

    let owner = state
        .lawpay_states
        .consume(&oauth_state)
        .await?
        .ok_or_else(|| ApiError::validation("invalid or expired state"))?;
    if owner != current.id() {
        return Err(ApiError::Forbidden(
            "state was issued to a different user".into(),
        ));
    }

    let token = state.lawpay.exchange_code(&code).await?;
    let connection = LawPayConnection::from_token(token, current.id(), Utc::now());
    state.db.lawpay().save(&connection).await?;

    tracing::info!(merchant_id = ?connection.merchant_id, by = %current.id(), "LawPay connected");
    let location = format!(
        "{}/admin/integrations?lawpay=connected",
        state.config.app_url.trim_end_matches('/')
    );
    Ok(redirect(&location))
}

pub async fn status(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    let connection = state.db.lawpay().get().await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "configured": state.lawpay.config().is_configured(),
            "connected": connection.is_some(),
            "merchant_id": connection.as_ref().and_then(|c| c.merchant_id.clone()),
            "connected_at": connection.as_ref().map(|c| c.connected_at),
        })),
    )
        .into_response())
}

pub async fn disconnect(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    authz::require(&current, ADMIN_ONLY)?;
    if !state.db.lawpay().delete().await? {
        return Err(ApiError::not_found("LawPay connection"));
    }

    tracing::info!(by = %current.id(), "LawPay disconnected");
    dto::success()
}
