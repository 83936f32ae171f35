use anyhow::{Context as _, Result};
use bedrock_chat_server::{AppState, ServerConfig, serve};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,bedrock_chat=debug";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load();
    init_tracing(config.log_json);

    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, state).await
}
