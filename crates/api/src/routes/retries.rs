//! On-demand retry trigger.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use herald_common::error::AppError;
use herald_common::types::RetrySummary;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/retries/run", post(run_retry))
}

/// POST /api/retries/run — Run one retry sweep now, with the configured
/// attempt budget. The periodic sweep uses the same path.
async fn run_retry(State(state): State<AppState>) -> Result<Json<RetrySummary>, AppError> {
    let summary = state
        .retry
        .retry_failed(state.config.retry_max_attempts)
        .await?;
    Ok(Json(summary))
}
