use async_openai::error::OpenAIError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_relay_shared::ErrorBody;
use thiserror::Error;

use crate::relay::UPSTREAM_ERROR_MESSAGE;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid message format")]
    InvalidMessageFormat,

    #[error("upstream completion failed: {0}")]
    Upstream(#[from] OpenAIError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Only the validation message is client-facing; other variants are logged
/// where they occur and answered with fixed text.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RelayError::InvalidMessageFormat => (StatusCode::BAD_REQUEST, self.to_string()),
            RelayError::Upstream(_) => (StatusCode::BAD_GATEWAY, UPSTREAM_ERROR_MESSAGE.to_string()),
            RelayError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
