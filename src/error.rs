use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::sql::BuildError;

/// Failure of a handler, mapped onto an HTTP status at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("invalid or expired token")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("{0}")]
    Invariant(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Build(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Database(_) | AppError::Invariant(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::Build(_) => "ValidationError",
            AppError::Unauthorized => "Unauthorized",
            AppError::NotFound => "NotFound",
            AppError::Forbidden => "Forbidden",
            AppError::MethodNotAllowed => "MethodNotAllowed",
            AppError::Database(_) => "DatabaseError",
            AppError::Invariant(_) => "InvariantViolation",
            AppError::Internal(_) => "InternalError",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    #[serde(rename = "type")]
    error_type: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: ErrorDetails,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            status: "error",
            error: ErrorDetails {
                error_type: self.error_type(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
