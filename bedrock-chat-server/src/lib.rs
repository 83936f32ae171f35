//! HTTP interface of bedrock-chat
//!
//! Routes:
//!
//! - `GET /health`
//! - `GET /api/config`
//! - `GET /api/models?provider=&supported_only=`
//! - `POST /api/chat`
//! - `POST /api/conversation/clear`, `GET /api/conversation/summary`
//! - `GET /api/catalog/...` when the data catalog is enabled
//!
//! Requests are assigned to a conversation by the `x-session-id` header.
use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
mod responses;
mod routes;
pub mod state;

pub use config::ServerConfig;
pub use responses::ApiError;
pub use routes::SESSION_HEADER;
pub use state::{AppState, AppStateBuilder};

/// The full application with middleware
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::new(state))
}

/// Serves `state` on `listener` until the process is stopped
///
/// # Errors
///
/// Errors if the server fails to accept connections
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app(state))
        .await
        .context("HTTP server stopped")
}
