//! Configuration management for AutoAb services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream catalog API
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Browse engine tuning
    #[serde(default)]
    pub browse: BrowseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog REST API, e.g. `http://localhost:5000/api`
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_catalog_retries")]
    pub max_retries: u32,

    /// Default page size for list queries
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Serve records from this JSON file instead of calling `base_url`
    #[serde(default)]
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseConfig {
    /// Quiescence window before a free-text query is fetched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Queries shorter than this (after trimming) produce no suggestions
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Cap per suggestion category
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions_per_category: usize,

    /// List autoantibody suggestions before disease suggestions
    #[serde(default = "default_enabled")]
    pub autoantibody_first: bool,

    /// Catalog pages fetched at once when computing stats
    #[serde(default = "default_stats_concurrency")]
    pub stats_concurrency: usize,

    /// Stats read at most this many pages
    #[serde(default = "default_stats_max_pages")]
    pub stats_max_pages: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_catalog_url() -> String { "http://localhost:5000/api".to_string() }
fn default_catalog_timeout() -> u64 { 10 }
fn default_catalog_retries() -> u32 { 2 }
fn default_page_size() -> u32 { 50 }
fn default_debounce_ms() -> u64 { 300 }
fn default_min_query_len() -> usize { 2 }
fn default_max_suggestions() -> usize { 50 }
fn default_stats_concurrency() -> usize { 4 }
fn default_stats_max_pages() -> u32 { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "autoab-gateway".to_string() }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
            max_retries: default_catalog_retries(),
            page_size: default_page_size(),
            fixture_path: None,
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            max_suggestions_per_category: default_max_suggestions(),
            autoantibody_first: default_enabled(),
            stats_concurrency: default_stats_concurrency(),
            stats_max_pages: default_stats_max_pages(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__CATALOG__BASE_URL=http://catalog:5000/api
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get catalog API timeout as Duration
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    /// Get the suggestion debounce window as Duration
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.browse.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.debounce_window(), Duration::from_millis(300));
        assert_eq!(config.browse.min_query_len, 2);
        assert_eq!(config.browse.max_suggestions_per_category, 50);
        assert!(config.browse.autoantibody_first);
        assert_eq!(config.browse.stats_concurrency, 4);
        assert_eq!(config.browse.stats_max_pages, 200);
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("catalog.base_url", "http://catalog:5000/api")
            .unwrap()
            .set_override("browse.debounce_ms", 150)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.catalog.base_url, "http://catalog:5000/api");
        assert_eq!(config.catalog.max_retries, 2);
        assert_eq!(config.debounce_window(), Duration::from_millis(150));
        assert_eq!(config.observability.log_level, "info");
    }
}
