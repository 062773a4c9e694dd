// src/server/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::BackofficeError;

/// Failure envelope: `{ "success": false, "error": "<message>" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                success: false,
                error: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Log `err` and turn it into a response. Caller mistakes keep their
    /// message; everything else is reported as `context`.
    pub fn failed(context: &str, err: BackofficeError) -> Self {
        match err {
            BackofficeError::InvalidInput(message) => Self::bad_request(message),
            BackofficeError::TabNotFound(_)
            | BackofficeError::RowNotFound { .. }
            | BackofficeError::EventNotFound(_) => Self::not_found(err.to_string()),
            other => {
                tracing::error!(error = %other, "{context}");
                Self::internal(context)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.body.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<BackofficeError> for ApiError {
    fn from(err: BackofficeError) -> Self {
        Self::failed("Internal server error", err)
    }
}
