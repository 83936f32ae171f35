//! Server configuration
//!
//! Every option can be given as flag or environment variable. A `.env` file in the working
//! directory is loaded before parsing.
use std::{net::SocketAddr, time::Duration};

use anyhow::{Context as _, Result};
use bedrock_chat_core::{
    conversation::ContextBudget,
    errors::ChatError,
    generation::GenerationLimits,
    session::{DEFAULT_MAX_SESSIONS, SessionStore},
};
use bedrock_chat_integrations::aws_bedrock::ModelFamily;
use clap::{Parser, builder::RangedU64ValueParser};

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

#[derive(Debug, Clone, Parser)]
#[command(name = "bedrock-chat", version, about = "Chat with AWS Bedrock foundation models")]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, env = "BEDROCK_CHAT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "BEDROCK_CHAT_PORT", default_value_t = 5000)]
    pub port: u16,

    /// AWS region of Bedrock and Glue
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Model id, inference profile id or arn every chat is sent to
    #[arg(long, env = "BEDROCK_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    #[arg(long, default_value_t = 0.7)]
    pub default_temperature: f32,

    #[arg(long, default_value_t = 1000)]
    pub default_max_tokens: u32,

    /// Requested `max_tokens` are clamped to this
    #[arg(long, default_value_t = 4000)]
    pub max_tokens_ceiling: u32,

    /// Most turns sent as context, 0 for no limit
    #[arg(long, default_value_t = 20)]
    pub context_max_turns: usize,

    /// Most characters sent as context, 0 for no limit
    #[arg(long, default_value_t = 24_000)]
    pub context_max_chars: usize,

    /// Timeout of a single call to AWS, at least one second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// Most conversations kept in memory; the least recently used is dropped first
    #[arg(
        long,
        env = "BEDROCK_CHAT_MAX_SESSIONS",
        default_value_t = DEFAULT_MAX_SESSIONS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_sessions: usize,

    /// Do not read the Glue Data Catalog
    #[arg(long)]
    pub disable_catalog: bool,

    /// Log as json lines
    #[arg(long)]
    pub log_json: bool,
}

impl ServerConfig {
    /// Loads `.env` if present, then parses flags and environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Fails fast on a model id no formatter exists for
    ///
    /// # Errors
    ///
    /// Errors with `UnsupportedModel` if the model id does not belong to a known family
    pub fn validate(&self) -> Result<ModelFamily, ChatError> {
        ModelFamily::from_model_id(&self.model_id)
    }

    pub fn limits(&self) -> GenerationLimits {
        GenerationLimits {
            default_temperature: self.default_temperature,
            default_max_tokens: self.default_max_tokens,
            max_tokens_ceiling: self.max_tokens_ceiling,
        }
    }

    pub fn context_budget(&self) -> ContextBudget {
        ContextBudget {
            max_turns: Some(self.context_max_turns).filter(|turns| *turns > 0),
            max_chars: Some(self.context_max_chars).filter(|chars| *chars > 0),
        }
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::with_budget(self.context_budget()).with_max_sessions(self.max_sessions)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// # Errors
    ///
    /// Errors if host and port do not form a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["bedrock-chat", "--region", "eu-west-1"];
        argv.extend_from_slice(args);
        if !args.contains(&"--model-id") {
            argv.extend_from_slice(&["--model-id", DEFAULT_MODEL_ID]);
        }
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--host", "0.0.0.0", "--port", "5000"]);

        assert_eq!(config.limits(), GenerationLimits::default());
        assert_eq!(config.context_budget(), ContextBudget::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.sessions().max_sessions(), DEFAULT_MAX_SESSIONS);
        assert!(!config.disable_catalog);
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:5000");
        assert_eq!(config.validate().unwrap(), ModelFamily::Anthropic);
    }

    #[test]
    fn test_zero_disables_context_bounds() {
        let config = parse(&["--context-max-turns", "0", "--context-max-chars", "0"]);
        assert_eq!(config.context_budget(), ContextBudget::unbounded());
    }

    #[test]
    fn test_unsupported_model_is_rejected() {
        let config = parse(&["--model-id", "cohere.command-r-v1:0"]);
        assert!(matches!(
            config.validate(),
            Err(ChatError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_invalid_host() {
        let config = parse(&["--host", "not a host"]);
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = ServerConfig::try_parse_from([
            "bedrock-chat",
            "--model-id",
            DEFAULT_MODEL_ID,
            "--request-timeout-secs",
            "0",
        ])
        .unwrap_err();

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_zero_max_sessions_is_rejected() {
        let err = ServerConfig::try_parse_from([
            "bedrock-chat",
            "--model-id",
            DEFAULT_MODEL_ID,
            "--max-sessions",
            "0",
        ])
        .unwrap_err();

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_max_sessions_is_applied() {
        let config = parse(&["--max-sessions", "3", "--context-max-turns", "4"]);
        let sessions = config.sessions();

        assert_eq!(sessions.max_sessions(), 3);
        assert_eq!(sessions.budget().max_turns, Some(4));
    }
}
