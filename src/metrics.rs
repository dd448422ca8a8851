/// Prometheus metrics for DisTim
///
/// Covers HTTP traffic plus the domain events worth watching on a dashboard:
/// QR unlock attempts, stamps, story generations and content views.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("http_requests_total registers once");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("http_request_duration_seconds registers once");

    /// QR unlock attempts by result (unlocked, invalid_token, no_token)
    pub static ref UNLOCK_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distim_unlock_attempts_total",
        "Totem page loads by unlock result",
        &["result"]
    )
    .expect("distim_unlock_attempts_total registers once");

    /// New stamps by store (device, account)
    pub static ref STAMPS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distim_stamps_recorded_total",
        "Stamps newly recorded",
        &["target"]
    )
    .expect("distim_stamps_recorded_total registers once");

    /// Stories by source (model, fallback)
    pub static ref STORIES_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distim_stories_generated_total",
        "Stories generated",
        &["source"]
    )
    .expect("distim_stories_generated_total registers once");

    pub static ref CONTENT_VIEWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distim_content_views_total",
        "Content detail views",
        &["category"]
    )
    .expect("distim_content_views_total registers once");

    /// Errors returned to clients by kind
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "distim_errors_total",
        "Errors returned to clients",
        &["kind"]
    )
    .expect("distim_errors_total registers once");
}

/// Render all metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics output is not UTF-8: {}", e);
        String::new()
    })
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_unlock_attempt(result: &str) {
    UNLOCK_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_stamp(target: &str) {
    STAMPS_RECORDED_TOTAL.with_label_values(&[target]).inc();
}

pub fn record_story(source: &str) {
    STORIES_GENERATED_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_content_view(category: &str) {
    CONTENT_VIEWS_TOTAL.with_label_values(&[category]).inc();
}

pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/totems", 200, 0.012);

        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_domain_counters_rendered() {
        record_unlock_attempt("unlocked");
        record_stamp("device");
        record_story("fallback");
        record_content_view("poezie");
        record_error("NotFound");

        let metrics = render_metrics();
        assert!(metrics.contains("distim_unlock_attempts_total"));
        assert!(metrics.contains("distim_stamps_recorded_total"));
        assert!(metrics.contains("distim_stories_generated_total"));
        assert!(metrics.contains("distim_content_views_total"));
        assert!(metrics.contains("distim_errors_total"));
    }

    #[test]
    fn test_counter_increments() {
        let before = UNLOCK_ATTEMPTS_TOTAL.with_label_values(&["no_token"]).get();
        record_unlock_attempt("no_token");
        assert!(UNLOCK_ATTEMPTS_TOTAL.with_label_values(&["no_token"]).get() > before);
    }
}
