use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::EngineError;
use crate::utils::signature::SignatureError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Signature(#[from] SignatureError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Engine(err) => match err {
                EngineError::InvalidAmount(_)
                | EngineError::InvalidFormat(_)
                | EngineError::UnsupportedCurrency(_)
                | EngineError::InvalidStatus(_)
                | EngineError::Mismatch(_) => StatusCode::BAD_REQUEST,
                EngineError::DuplicateReference(_) | EngineError::AlreadyResolved { .. } => {
                    StatusCode::CONFLICT
                }
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Signature(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Caller-facing text. Server-side failures never leak their detail.
    fn public_message(&self) -> String {
        match self {
            AppError::Engine(EngineError::Storage(_)) => "Internal server error".to_string(),
            AppError::Engine(EngineError::DuplicateReference(_)) => {
                "Transaction with the same reference already exists".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({
            "responseCode": status.as_u16(),
            "responseMessage": self.public_message(),
        }));

        (status, body).into_response()
    }
}
