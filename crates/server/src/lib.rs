//! HTTP caching proxy surface for Knox.
//!
//! This crate provides:
//! - The cache read path: serve-or-fetch with cross-process single-flight
//! - Serve-time HTML link rewriting and service-worker injection
//! - The create form, admin listing, and service-worker endpoints

pub mod error;
pub mod fetch;
pub mod flight;
pub mod handlers;
pub mod rewrite;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
