use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use bedrock_chat_core::generation::{ChatRequest, InvocationResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::session_key;
use crate::{responses::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub(crate) struct ChatResponse {
    success: bool,
    response: String,
    model_id: String,
    session_id: Uuid,
    metadata: ChatMetadata,
}

#[derive(Debug, Serialize)]
struct ChatMetadata {
    processing_time_ms: u64,
    has_context: bool,
    has_catalog_context: bool,
    conversation_length: usize,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_tokens: Option<u32>,
    timestamp: DateTime<Utc>,
}

impl From<InvocationResult> for ChatResponse {
    fn from(result: InvocationResult) -> Self {
        let processing_time_ms = result.processing_time_ms();

        ChatResponse {
            success: true,
            response: result.text,
            model_id: result.model_id,
            session_id: result.session_id,
            metadata: ChatMetadata {
                processing_time_ms,
                has_context: result.has_context,
                has_catalog_context: result.has_catalog_context,
                conversation_length: result.conversation_length,
                temperature: result.params.temperature,
                max_tokens: result.params.max_tokens,
                input_tokens: result.usage.map(|usage| usage.input_tokens),
                output_tokens: result.usage.map(|usage| usage.output_tokens),
                timestamp: result.completed_at,
            },
        }
    }
}

pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let key = session_key(&headers);
    let conversation = state.sessions.conversation(&key);

    tracing::debug!(session_key = %key, "Chat request");

    let result = state.invoker.invoke(&conversation, request).await?;

    Ok(Json(result.into()))
}
