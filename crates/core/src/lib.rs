//! Core domain types and shared logic for the Knox resource cache.
//!
//! This crate defines the vocabulary used across all other crates:
//! - The bijective URL <-> cache-key encoding
//! - The stored header-block wire format
//! - Configuration types
//! - The core error enum

pub mod config;
pub mod encoder;
pub mod error;
pub mod headers;

pub use config::{AppConfig, ServerConfig, StoreConfig};
pub use error::{Error, Result};

/// Response headers never persisted or served back to clients.
pub const FILTERED_RESPONSE_HEADERS: [&str; 5] = [
    "content-length",
    "alt-svc",
    "date",
    "strict-transport-security",
    "via",
];
