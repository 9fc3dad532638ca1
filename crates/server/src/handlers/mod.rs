//! HTTP handlers.

mod admin;
mod cache;
mod create;
mod worker;

pub use admin::{admin_list, delete_resource};
pub use cache::serve_cached;
pub use create::create_page;
pub use worker::service_worker;

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;

/// GET /healthz - metadata and blob store connectivity.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.metadata.health_check().await?;
    state.blobs.health_check().await?;
    Ok("ok")
}
