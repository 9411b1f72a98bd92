//! AutoAb API Gateway
//!
//! Serves the browse engine's view models as JSON:
//! - Disease tree and record table for the applied filters
//! - Dependent dropdown options
//! - Ranked autocomplete suggestions
//! - Dashboard statistics
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use autoab_browse::{InMemoryCatalog, SuggestionRanker};
use autoab_common::{config::AppConfig, metrics, CatalogApi, HttpCatalogClient};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogApi>,
    pub ranker: Arc<SuggestionRanker>,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: Arc<dyn CatalogApi>) -> Self {
        let ranker = SuggestionRanker::from_config(&config.browse);
        Self {
            config: Arc::new(config),
            catalog,
            ranker: Arc::new(ranker),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);
    info!(
        service = %config.observability.service_name,
        "Starting AutoAb API Gateway v{}",
        autoab_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Metrics exporter listening");
    }
    metrics::register_metrics();

    let catalog = build_catalog(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(AppState::new(config, catalog));

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.observability.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Fixture file when configured, otherwise the catalog REST API
fn build_catalog(config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogApi>> {
    match &config.catalog.fixture_path {
        Some(path) => {
            warn!(path = %path, "Serving records from a fixture file, catalog API is not used");
            Ok(Arc::new(InMemoryCatalog::from_json_file(path)?))
        }
        None => {
            info!(base_url = %config.catalog.base_url, "Using catalog API");
            Ok(Arc::new(HttpCatalogClient::new(&config.catalog)?))
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Browse endpoints
        .route("/browse/tree", get(handlers::browse::tree))
        .route("/browse/records", get(handlers::browse::records))
        .route("/browse/options/{field}", get(handlers::browse::options))
        .route("/browse/suggestions", get(handlers::browse::suggestions))
        .route("/browse/stats", get(handlers::browse::stats))

        // Record endpoints
        .route("/records/validate", post(handlers::records::validate));

    let request_timeout = state.config.request_timeout();

    Router::new()
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
