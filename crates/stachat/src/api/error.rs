use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use stachat_core::GenerationError;
use thiserror::Error;

use crate::api::auth::AuthenticationError;

/// Errors emitted by the API gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("authentication failure: {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("internal gateway failure: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Handler(HandlerError::Validation(_)) => StatusCode::BAD_REQUEST,
            GatewayError::Handler(HandlerError::Generation(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Handler(HandlerError::Validation(_)) => "validation",
            GatewayError::Handler(HandlerError::Generation(_)) => "generation",
            GatewayError::Authentication(_) => "authentication",
            GatewayError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status(), Json(payload)).into_response()
    }
}

/// Errors emitted by the request handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}
