use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{dashboard, handlers, middleware, tickets};
use crate::state::AppState;

/// Multipart overhead allowed on top of the attachment size cap.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config, metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Tickets
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}", delete(tickets::delete_ticket))
        .route("/tickets/{id}/extraction", get(tickets::get_extraction))
        .route("/tickets/{id}/ai-processing", get(tickets::get_ai_processing))
        .route(
            "/tickets/{id}/invoice-processing",
            get(tickets::get_invoice_processing),
        )
        .route("/tickets/{id}/process-ai", post(tickets::process_ai))
        .route("/tickets/{id}/process-invoice", post(tickets::process_invoice))
        .route("/tickets/{id}/reprocess", post(tickets::reprocess_ticket))
        // Dashboard
        .route("/dashboard/metrics", get(dashboard::get_metrics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(
            tickets::MAX_ATTACHMENT_BYTES + BODY_LIMIT_SLACK,
        ))
}
