//! Metrics definitions for the casting service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `casting_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP verbs only
//! - `endpoint`: route templates (`/actors/{id}`), unknown paths collapse to `/other`
//! - `status`: success, error, timeout
//! - `operation`: store method names
//! - `reason`: fixed auth failure reasons

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{
    Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use std::time::Duration;

/// Build a Prometheus recorder with the service's histogram buckets.
///
/// The recorder is not installed; callers decide whether it becomes the
/// global recorder (`main`) or only backs a handle (tests).
///
/// # Errors
///
/// Returns an error string if bucket configuration is rejected.
pub fn build_recorder() -> Result<PrometheusRecorder, String> {
    Ok(builder()?.build_recorder())
}

/// Install the Prometheus recorder globally and return its handle.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error string if the recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    builder()?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

fn builder() -> Result<PrometheusBuilder, String> {
    PrometheusBuilder::new()
        // HTTP request buckets aligned with a 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("casting_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("casting_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `casting_http_requests_total`, `casting_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("casting_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("casting_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize a request path to its route template.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/actors" => "/actors",
        "/movies" => "/movies",
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> &'static str {
    let mut segments = path.trim_start_matches('/').split('/');

    match (segments.next(), segments.next(), segments.next()) {
        (Some("actors"), Some(id), None) if !id.is_empty() => "/actors/{id}",
        (Some("movies"), Some(id), None) if !id.is_empty() => "/movies/{id}",
        _ => "/other",
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a rejected request at the permission gate.
///
/// Metric: `casting_auth_failures_total`
/// Labels: `reason` (`invalid_token`, `invalid_claims`, `missing_permission`, `jwks_unavailable`)
pub fn record_auth_failure(reason: &'static str) {
    counter!("casting_auth_failures_total", "reason" => reason).increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record a store query.
///
/// Metric: `casting_db_query_duration_seconds`, `casting_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("casting_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("casting_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // Recording without an installed recorder goes to the no-op recorder;
    // these tests exercise the label construction paths.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/actors", 200, Duration::from_millis(20));
        record_http_request("PATCH", "/actors/3", 422, Duration::from_millis(8));
        record_http_request("DELETE", "/movies/1", 404, Duration::from_millis(4));
        record_http_request("GET", "/actors", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(422), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/actors"), "/actors");
        assert_eq!(normalize_endpoint("/movies"), "/movies");
    }

    #[test]
    fn test_normalize_endpoint_resource_paths() {
        assert_eq!(normalize_endpoint("/actors/1"), "/actors/{id}");
        assert_eq!(normalize_endpoint("/actors/not-a-number"), "/actors/{id}");
        assert_eq!(normalize_endpoint("/movies/42"), "/movies/{id}");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/castings"), "/other");
        assert_eq!(normalize_endpoint("/actors/"), "/other");
        assert_eq!(normalize_endpoint("/actors/1/movies"), "/other");
    }

    #[test]
    fn test_record_auth_failure() {
        record_auth_failure("invalid_token");
        record_auth_failure("missing_permission");
    }

    #[test]
    fn test_record_db_query() {
        record_db_query("list_actors", "success", Duration::from_millis(3));
        record_db_query("delete_movie", "error", Duration::from_millis(50));
    }

    #[test]
    fn test_build_recorder_handle_renders() {
        let recorder = build_recorder().expect("bucket configuration is valid");
        let handle = recorder.handle();
        // Nothing recorded through this recorder yet
        assert!(!handle.render().contains("casting_http_requests_total"));
    }
}
