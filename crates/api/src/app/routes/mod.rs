use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod bridge;
pub mod categories;
pub mod documents;
pub mod google_drive;
pub mod journeys;
pub mod lawpay;
pub mod matters;
pub mod oauth_providers;
pub mod payments;
pub mod snapshots;
pub mod system;
pub mod users;

/// Endpoints reachable without a session.
pub fn public() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/oauth-providers/enabled", get(oauth_providers::list_enabled))
}

/// Router for all authenticated endpoints.
pub fn protected() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/matters", matters::router())
        .nest("/documents", documents::router())
        .nest("/snapshots", snapshots::router())
        .nest("/service-categories", categories::router())
        .nest("/journeys", journeys::router())
        .nest("/journey-steps", journeys::steps_router())
        .nest("/oauth-providers", oauth_providers::router())
        .nest("/payments", payments::router())
        .nest("/lawpay", lawpay::router())
        .nest("/google-drive", google_drive::router())
        .nest("/bridge", bridge::router())
}
