use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::{errors, AppState};

pub async fn health(Extension(state): Extension<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "ok" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            errors::json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "database is unreachable",
            )
        }
    }
}
