use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use bedrock_chat_core::model::ModelDescriptor;
use serde::{Deserialize, Serialize};

use crate::{responses::ApiError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ModelsQuery {
    /// Case insensitive provider name, e.g. `anthropic`
    provider: Option<String>,
    /// Only models this service can chat with
    #[serde(default)]
    supported_only: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelsResponse {
    success: bool,
    models: Vec<ModelDescriptor>,
    count: usize,
}

pub(crate) async fn list_models(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ModelsQuery>, QueryRejection>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let Query(query) = query?;
    let models = state
        .models
        .list_models()
        .await?
        .into_iter()
        .filter(|model| {
            query
                .provider
                .as_deref()
                .is_none_or(|provider| model.is_from_provider(provider))
        })
        .filter(|model| !query.supported_only || model.is_supported())
        .collect::<Vec<_>>();

    Ok(Json(ModelsResponse {
        success: true,
        count: models.len(),
        models,
    }))
}
