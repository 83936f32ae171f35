use std::sync::Arc;

use axum::{Json, extract::State};
use bedrock_chat_core::{conversation::ContextBudget, generation::GenerationLimits};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct ConfigResponse {
    model_id: String,
    region: String,
    agent_initialized: bool,
    max_tokens_limit: u32,
    temperature_range: [f32; 2],
    default_temperature: f32,
    default_max_tokens: u32,
    context_budget: ContextBudget,
    request_timeout_secs: u64,
    catalog_enabled: bool,
}

pub(crate) async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let limits = state.invoker.limits();
    let (min_temperature, max_temperature) = GenerationLimits::TEMPERATURE_RANGE;

    Json(ConfigResponse {
        model_id: state.invoker.model_id().to_string(),
        region: state.region.clone(),
        agent_initialized: true,
        max_tokens_limit: limits.max_tokens_ceiling,
        temperature_range: [min_temperature, max_temperature],
        default_temperature: limits.default_temperature,
        default_max_tokens: limits.default_max_tokens,
        context_budget: state.sessions.budget(),
        request_timeout_secs: state.invoker.timeout().as_secs(),
        catalog_enabled: state.catalog().is_some(),
    })
}
