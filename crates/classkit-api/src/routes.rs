//! API route definitions.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, licenses};
use crate::middleware;
use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(axum_middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .with_state(state)
}

fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/licenses", license_routes())
        .nest("/admin", admin_routes(state))
}

fn license_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{code}/activate", post(licenses::activate))
        .route(
            "/{code}/activations/{device_id}",
            get(licenses::check).delete(licenses::deactivate),
        )
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/licenses",
            get(admin::list_licenses).post(admin::create_license),
        )
        .route("/licenses/{code}", delete(admin::revoke_license))
        .route(
            "/licenses/{code}/devices/{device_id}",
            delete(admin::reset_device),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_admin,
        ))
}
