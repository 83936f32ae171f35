use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use bedrock_chat_core::conversation::{Conversation, ConversationSummary};
use serde::Serialize;
use uuid::Uuid;

use super::session_key;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct ClearResponse {
    success: bool,
    message: &'static str,
    session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(crate) struct SummaryResponse {
    success: bool,
    summary: ConversationSummary,
}

/// Waits for an invocation in flight on the same session before clearing
///
/// An unknown session is already empty and is not created.
pub(crate) async fn clear(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ClearResponse> {
    let key = session_key(&headers);

    let session_id = match state.sessions.get(&key) {
        Some(conversation) => {
            let mut conversation = conversation.lock().await;
            conversation.clear();
            conversation.session_id()
        }
        None => Conversation::new(state.sessions.budget()).session_id(),
    };
    tracing::info!(session_key = %key, %session_id, "Conversation cleared");

    Json(ClearResponse {
        success: true,
        message: "Conversation cleared",
        session_id,
    })
}

pub(crate) async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<SummaryResponse> {
    let summary = match state.sessions.get(&session_key(&headers)) {
        Some(conversation) => conversation.lock().await.summary(),
        None => Conversation::new(state.sessions.budget()).summary(),
    };

    Json(SummaryResponse {
        success: true,
        summary,
    })
}
