use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::domain::error::{DomainError, FieldViolation};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub(crate) type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<FieldViolation>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, violations) = match self {
            AppError::Domain(err) => match err {
                DomainError::Validation(violations) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation failed".to_string(),
                    Some(violations),
                ),
                DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, err.to_string(), None),
                DomainError::Unauthenticated => (StatusCode::UNAUTHORIZED, err.to_string(), None),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string(), None),
                DomainError::Forbidden => (StatusCode::FORBIDDEN, err.to_string(), None),
                DomainError::Internal(detail) => {
                    error!(%detail, "internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                        None,
                    )
                }
            },
            AppError::Validation(err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string(), None),
            AppError::Internal(err) => {
                error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: msg,
                violations,
            }),
        )
            .into_response()
    }
}
