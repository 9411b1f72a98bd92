//! AutoAb Common Library
//!
//! Shared code for the AutoAb catalog services including:
//! - Record model, filter state and list envelopes
//! - Priority normalisation
//! - Catalog API boundary and HTTP client
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod catalog;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod priority;

// Re-export commonly used types
pub use catalog::{CatalogApi, HttpCatalogClient};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{FilterField, FilterState, Record, RecordPage};
pub use priority::{parse_priority, Priority};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
