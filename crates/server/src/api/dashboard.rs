//! Dashboard API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use docket_core::{compute_metrics, DashboardMetrics};

use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /api/v1/dashboard/metrics
///
/// Aggregated pipeline health, recomputed from the store on every call.
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardMetrics>, (StatusCode, Json<ErrorResponse>)> {
    let metrics = compute_metrics(state.store()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;
    Ok(Json(metrics))
}
