use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bedrock_chat_core::errors::{CatalogError, ChatError};
use serde_json::json;

/// Every way a request can fail, rendered as `{"success": false, "error": ...}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("data catalog is disabled")]
    CatalogDisabled,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Endpoint not found")]
    NotFound,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Chat(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Chat(_) | ApiError::Catalog(CatalogError::Unavailable(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Catalog(CatalogError::NotFound(_))
            | ApiError::CatalogDisabled
            | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Chat(err) => err.kind(),
            ApiError::Catalog(CatalogError::NotFound(_)) | ApiError::NotFound => "not_found",
            ApiError::Catalog(CatalogError::Unavailable(_)) => "catalog_unavailable",
            ApiError::CatalogDisabled => "catalog_disabled",
            ApiError::InvalidBody(_) | ApiError::InvalidQuery(_) => "invalid_input",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
                "kind": self.kind(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ChatError::invalid_input("x").into(), StatusCode::BAD_REQUEST),
            (ChatError::unsupported_model("x").into(), StatusCode::BAD_REQUEST),
            (
                ChatError::upstream(anyhow::anyhow!("x")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ChatError::malformed(anyhow::anyhow!("x")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CatalogError::NotFound("db".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                CatalogError::unavailable(anyhow::anyhow!("x")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::CatalogDisabled, StatusCode::NOT_FOUND),
            (ApiError::InvalidBody("eof".into()), StatusCode::BAD_REQUEST),
            (ApiError::InvalidQuery("bool".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            let error: ApiError = error;
            assert_eq!(error.status(), status, "{error}");
        }
    }
}
