//! HTTP server for the docket invoice pipeline.
//!
//! A thin axum layer over `docket-core`: multipart ticket intake,
//! per-stage views and triggers, dashboard aggregation, and the
//! Prometheus scrape surface. All pipeline semantics live in the core
//! crate; handlers translate between HTTP and orchestrator calls.

pub mod api;
pub mod metrics;
pub mod state;
