use thiserror::Error;

/// Failures of a single chat invocation or model catalog query.
///
/// None of these are fatal to the process; every request fails on its own and the conversation it
/// targeted is left as it was.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Missing or unusable input, e.g. a blank prompt
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model id does not belong to a model family we know how to format for
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Network, credential, quota or timeout failures talking to Bedrock
    #[error("upstream unavailable: {0:#}")]
    UpstreamUnavailable(anyhow::Error),

    /// Bedrock answered, but not in the shape the model family promises
    #[error("malformed response: {0:#}")]
    MalformedResponse(anyhow::Error),
}

impl ChatError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ChatError::InvalidInput(message.into())
    }

    pub fn unsupported_model(model_id: impl Into<String>) -> Self {
        ChatError::UnsupportedModel(model_id.into())
    }

    pub fn upstream(error: impl Into<anyhow::Error>) -> Self {
        ChatError::UpstreamUnavailable(error.into())
    }

    pub fn malformed(error: impl Into<anyhow::Error>) -> Self {
        ChatError::MalformedResponse(error.into())
    }

    /// Stable, machine readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidInput(_) => "invalid_input",
            ChatError::UnsupportedModel(_) => "unsupported_model",
            ChatError::UpstreamUnavailable(_) => "upstream_unavailable",
            ChatError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// True if the caller sent something we refuse regardless of upstream state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChatError::InvalidInput(_) | ChatError::UnsupportedModel(_)
        )
    }
}

/// Failures when reading the data catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("catalog unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

impl CatalogError {
    pub fn unavailable(error: impl Into<anyhow::Error>) -> Self {
        CatalogError::Unavailable(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_client_error() {
        let err = ChatError::invalid_input("prompt is required");
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "invalid input: prompt is required");

        let err = ChatError::upstream(anyhow::anyhow!("timed out"));
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "upstream unavailable: timed out");
    }

    #[test]
    fn test_context_chain_is_rendered() {
        use anyhow::Context as _;

        let source: anyhow::Result<()> = Err(anyhow::anyhow!("missing field `results`"));
        let err = ChatError::malformed(source.context("Failed to parse response").unwrap_err());

        assert_eq!(
            err.to_string(),
            "malformed response: Failed to parse response: missing field `results`"
        );
    }
}
