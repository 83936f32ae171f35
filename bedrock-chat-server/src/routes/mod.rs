use std::sync::Arc;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use bedrock_chat_core::session::DEFAULT_SESSION_KEY;

use crate::{responses::ApiError, state::AppState};

mod catalog;
mod chat;
mod config;
mod conversation;
mod health;
mod models;

/// Header selecting the conversation a request belongs to
pub const SESSION_HEADER: &str = "x-session-id";

pub(crate) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/models", get(models::list_models))
        .route("/api/chat", post(chat::chat))
        .route("/api/conversation/clear", post(conversation::clear))
        .route("/api/conversation/summary", get(conversation::summary))
        .route("/api/config", get(config::config))
        .route("/api/catalog/databases", get(catalog::list_databases))
        .route("/api/catalog/databases/:database", get(catalog::database))
        .route(
            "/api/catalog/databases/:database/tables",
            get(catalog::list_tables),
        )
        .route(
            "/api/catalog/databases/:database/tables/:table",
            get(catalog::table),
        )
        .route("/api/catalog/search", get(catalog::search))
        .route("/api/catalog/stats", get(catalog::stats))
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// The session key of a request, `default` if none or an empty one was sent
fn session_key(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .unwrap_or(DEFAULT_SESSION_KEY)
        .to_string()
}
