//! Bridge 에러 타입

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Bridge 에러
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Core(#[from] dgw_core::Error),
}

/// 에러 응답 JSON
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            BridgeError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BadRequest", message.clone())
            }
            BridgeError::Forbidden { message } => {
                (StatusCode::FORBIDDEN, "Forbidden", message.clone())
            }
            BridgeError::NotFound { message } => {
                (StatusCode::NOT_FOUND, "EntityNotFound", message.clone())
            }
            BridgeError::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UnexpectedError",
                    "internal server error".to_string(),
                )
            }
            BridgeError::Core(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!("Core error: {}", e);
                }
                (status, e.sub_status(), e.to_string())
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                request_id: crate::middleware::current_request_id(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
