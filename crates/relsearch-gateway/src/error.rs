//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relsearch_core::{Error as SearchError, ErrorBag, ErrorKind};
use serde::Serialize;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Search compilation failed.
    Search(SearchError),
    /// Bad request.
    BadRequest(String),
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Validation messages keyed by request path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<ErrorBag>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, messages) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::Search(err) => {
                let (status, code) = match err.kind() {
                    ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
                    ErrorKind::PermissionDenied => (StatusCode::UNAUTHORIZED, "PERMISSION_DENIED"),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                };
                let message = match err.kind() {
                    ErrorKind::PermissionDenied => {
                        "You do not have permission to view this resource.".to_string()
                    }
                    _ => err.to_string(),
                };
                let messages = match err {
                    SearchError::Validation(bag) => Some(bag),
                    _ => None,
                };
                (status, code, message, messages)
            }
        };

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
            messages,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Search(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}
