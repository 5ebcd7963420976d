//! Metrics and observability utilities
//!
//! Metric descriptions share the `tenderdesk` prefix and are registered once
//! at startup; the gateway renders them through a Prometheus recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all TenderDesk metrics
pub const METRICS_PREFIX: &str = "tenderdesk";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Accounts
    describe_counter!(
        format!("{}_registrations_total", METRICS_PREFIX),
        Unit::Count,
        "Accounts created"
    );

    describe_counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts by outcome"
    );

    // Tenders and documents
    describe_counter!(
        format!("{}_tenders_created_total", METRICS_PREFIX),
        Unit::Count,
        "Tenders created"
    );

    describe_counter!(
        format!("{}_documents_uploaded_total", METRICS_PREFIX),
        Unit::Count,
        "Documents uploaded"
    );

    describe_counter!(
        format!("{}_extraction_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Documents whose text could not be extracted"
    );

    describe_counter!(
        format!("{}_prediction_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Tenders scored with default values"
    );

    describe_counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Requests rejected by the rate limiter"
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

/// Record a login attempt
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_registration() {
    counter!(format!("{}_registrations_total", METRICS_PREFIX)).increment(1);
}

pub fn record_tender_created(category: &str) {
    counter!(
        format!("{}_tenders_created_total", METRICS_PREFIX),
        "category" => category.to_string()
    )
    .increment(1);
}

pub fn record_document_uploaded(file_type: &str) {
    counter!(
        format!("{}_documents_uploaded_total", METRICS_PREFIX),
        "file_type" => file_type.to_string()
    )
    .increment(1);
}

pub fn record_rate_limited(route: &'static str) {
    counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        "route" => route
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        let metrics = RequestMetrics::start("GET", "/api/tenders");
        metrics.finish(200);
        record_login(false);
        record_tender_created("Technology");
        // No recorder installed; calls must be no-ops
    }
}
