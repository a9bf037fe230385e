//! Crate-wide request error, rendered as `{"error": "..."}`.

use crate::domain::collection::FieldError;
use crate::storage::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("{0}")]
    BadRequest(String),

    #[error("Collection not allowed")]
    CollectionNotAllowed,

    #[error("Unknown action")]
    UnknownAction,

    #[error("Invalid field values")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("confirm must be true to run migrations")]
    ConfirmRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidJson
            | AppError::BadRequest(_)
            | AppError::CollectionNotAllowed
            | AppError::UnknownAction
            | AppError::Validation(_)
            | AppError::ConfirmRequired => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = match &self {
            AppError::Validation(errors) => json!({ "error": self.to_string(), "errors": errors }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
