//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket lifecycle (submissions, deletions)
//! - Stage orchestration (executions, durations)
//! - Extraction strategies
//! - External processor calls and fallbacks

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Ticket Lifecycle Metrics
// =============================================================================

/// Tickets submitted total.
pub static TICKETS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("docket_tickets_submitted_total", "Total tickets submitted").unwrap()
});

/// Tickets deleted total.
pub static TICKETS_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("docket_tickets_deleted_total", "Total tickets deleted").unwrap()
});

// =============================================================================
// Stage Orchestration Metrics
// =============================================================================

/// Stage executions total by stage and outcome.
pub static STAGE_EXECUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docket_stage_executions_total", "Total stage executions"),
        &["stage", "outcome"], // outcome: "completed", "error"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("docket_stage_duration_seconds", "Duration of stage runs")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Extraction Metrics
// =============================================================================

/// Extraction runs total by strategy and outcome.
pub static EXTRACTION_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docket_extraction_runs_total", "Total extraction runs"),
        &["strategy", "outcome"], // outcome: "ok", "error", "unreadable", "unavailable"
    )
    .unwrap()
});

// =============================================================================
// External Processor Metrics
// =============================================================================

/// Processor calls total by stage and outcome.
pub static PROCESSOR_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docket_processor_calls_total",
            "Total stage processor calls",
        ),
        &["stage", "outcome"], // outcome: "remote_ok", "remote_error", "simulated"
    )
    .unwrap()
});

/// Fallbacks to local simulation after a remote failure.
pub static PROCESSOR_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docket_processor_fallbacks_total",
            "Total remote processor failures handled by local simulation",
        ),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tickets
        Box::new(TICKETS_SUBMITTED.clone()),
        Box::new(TICKETS_DELETED.clone()),
        // Stages
        Box::new(STAGE_EXECUTIONS.clone()),
        Box::new(STAGE_DURATION_SECONDS.clone()),
        // Extraction
        Box::new(EXTRACTION_RUNS.clone()),
        // Processors
        Box::new(PROCESSOR_CALLS.clone()),
        Box::new(PROCESSOR_FALLBACKS.clone()),
    ]
}
