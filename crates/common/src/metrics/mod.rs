//! Metrics and observability utilities
//!
//! Prometheus-style metrics for upstream catalog calls and the browse
//! engine, with standardized naming conventions. Without an installed
//! recorder every helper here is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all AutoAb metrics
pub const METRICS_PREFIX: &str = "autoab";

/// Histogram buckets for upstream catalog latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Calls made to the catalog API"
    );

    describe_histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog API latency in seconds"
    );

    describe_counter!(
        format!("{}_suggestion_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Suggestion queries by outcome (fetched, superseded, short)"
    );

    describe_histogram!(
        format!("{}_tree_records", METRICS_PREFIX),
        Unit::Count,
        "Records folded into a disease tree"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one catalog API call
pub fn record_upstream(operation: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Record what happened to a suggestion query
pub fn record_suggestion_query(outcome: &'static str) {
    counter!(
        format!("{}_suggestion_queries_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the size of a freshly built disease tree
pub fn record_tree_build(records: usize) {
    histogram!(format!("{}_tree_records", METRICS_PREFIX)).record(records as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_helpers_without_recorder() {
        let metrics = RequestMetrics::start("GET", "/v1/browse/tree");
        metrics.finish(200);
        record_upstream("list_records", 0.02, true);
        record_suggestion_query("superseded");
        record_tree_build(12);
    }
}
