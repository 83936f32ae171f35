use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    agent_status: &'static str,
    region: String,
    model_id: String,
    timestamp: DateTime<Utc>,
}

/// Liveness only; upstream is not contacted
pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        agent_status: "initialized",
        region: state.region.clone(),
        model_id: state.invoker.model_id().to_string(),
        timestamp: Utc::now(),
    })
}
