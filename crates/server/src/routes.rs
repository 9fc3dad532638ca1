//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // User-facing create form (and ?url= submission)
        .route("/", get(handlers::create_page))
        // Cache read path: serves, or claims and fetches on first demand
        .route("/c/{key}", get(handlers::serve_cached))
        // Admin listing and soft delete
        .route("/admin/list/{page}", get(handlers::admin_list))
        .route("/admin/resource/{id}", delete(handlers::delete_resource))
        // Fetch-interception worker referenced by injected page scripts
        .route("/service-worker.js", get(handlers::service_worker))
        // Health check (for load balancers / probes)
        .route("/healthz", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
