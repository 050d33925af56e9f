//! HTTP API application wiring (Axum router + shared state).
//!
//! - `state.rs`: handles shared by every handler (database, sessions, LawPay)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and response envelopes
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(state: AppState) -> Router {
    // Protected routes: require a live session.
    let protected = routes::protected()
        .layer(Extension(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(routes::public().layer(Extension(state)))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::log_requests)))
}
