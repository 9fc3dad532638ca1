//! Metadata index for the Knox resource cache.
//!
//! This crate provides the control-plane data model: one durable record
//! per cached URL, the claim/finalize lifecycle that backs the
//! cross-process single-flight protocol, and the aggregate queries the
//! admin surface consumes.

pub mod error;
pub mod models;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{CacheStats, ResourceRow, ResourceStatus};
pub use store::{MetadataStore, SqliteStore};
