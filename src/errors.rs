use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::db::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests. Please try again later.")]
    TooManyRequests,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message exposed to the client. Server-side failures never leak details.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized(m)
            | AppError::BadRequest(m)
            | AppError::Validation(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m) => m.clone(),
            AppError::TooManyRequests => self.to_string(),
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Responding with server error");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": { "message": self.public_message() }
        }))
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
