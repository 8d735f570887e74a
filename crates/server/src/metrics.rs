//! Prometheus metrics for the HTTP surface.
//!
//! This module provides:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Ticket counts by pipeline status (collected dynamically on scrape)
//!
//! Core pipeline metrics (stage executions, processor calls) live in
//! `docket_core::metrics` and are registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use docket_core::{TicketFilter, TicketStatus};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docket_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docket_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "docket_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Ticket Metrics (collected dynamically)
// =============================================================================

/// Tickets by current pipeline status, sampled from the store on scrape.
pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "docket_tickets_by_status",
            "Current ticket count by pipeline status",
        ),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Tickets
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();

    // Core metrics (stages, extraction, processors)
    for metric in docket_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the per-status gauges from the ticket store.
///
/// Called before encoding so a scrape reports current counts rather
/// than values from the last write.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let store = state.store();
    for status in TicketStatus::ALL {
        let filter = TicketFilter::new().with_status(status);
        if let Ok(count) = store.count(&filter) {
            TICKETS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count);
        }
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let ticket_id_regex = regex_lite::Regex::new(r"DCK-\d{4}-\d{8}").unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = ticket_id_regex.replace_all(path, "{ticket_id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_ticket_id() {
        let path = "/api/v1/tickets/DCK-2026-12345678";
        assert_eq!(normalize_path(path), "/api/v1/tickets/{ticket_id}");
    }

    #[test]
    fn test_normalize_path_ticket_id_with_suffix() {
        let path = "/api/v1/tickets/DCK-2026-00000042/ai-processing";
        assert_eq!(
            normalize_path(path),
            "/api/v1/tickets/{ticket_id}/ai-processing"
        );
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/tickets/12345";
        assert_eq!(normalize_path(path), "/api/v1/tickets/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("docket_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_and_server_metrics() {
        // Touch metrics so they appear in output (Prometheus only
        // outputs metrics that have been accessed)
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        TICKETS_BY_STATUS.with_label_values(&["ingested"]).set(0);
        docket_core::metrics::TICKETS_SUBMITTED.inc();

        let output = encode_metrics();

        assert!(output.contains("docket_http_request_duration_seconds"));
        assert!(output.contains("docket_http_requests_total"));
        assert!(output.contains("docket_http_requests_in_flight"));
        assert!(output.contains("docket_tickets_by_status"));

        // Core metrics share the registry
        assert!(output.contains("docket_tickets_submitted_total"));
    }
}
