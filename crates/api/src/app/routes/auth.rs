use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use casebridge_core::EmailAddress;

use crate::app::dto::{self, LoginRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::context::CurrentUser;
use crate::middleware;

pub fn router() -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route("/session", get(session))
}

pub async fn login(
    Extension(state): Extension<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let email = EmailAddress::parse(body.email.as_deref().unwrap_or_default())?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("password is required"))?;

    let Some(user) = state.db.users().verify_credentials(&email, &password).await? else {
        tracing::info!(email = %email, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let token = state.sessions.create(&user).await?;
    let cookie = middleware::session_cookie(&token, state.sessions.ttl(), state.config.cookie_secure);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "user": user,
            "token": token.as_str(),
        })),
    )
        .into_response())
}

pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult {
    state.sessions.revoke(current.token()).await?;
    tracing::info!(user_id = %current.id(), "session closed");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, middleware::clear_session_cookie(state.config.cookie_secure))],
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn session(Extension(current): Extension<CurrentUser>) -> ApiResult {
    dto::envelope("user", current.user())
}
