//! Handler errors rendered as the `{success: false, error}` envelope.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use campus_core::DomainError;
use campus_core::error::RepoError;
use campus_core::ports::{AuthError, StorageError};
use campus_shared::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse::new(message))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Duplicate(msg) => AppError::Conflict(msg),
            DomainError::Unauthorized => AppError::Unauthorized("Unauthorized".to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Conflict(msg),
            RepoError::Connection(msg) | RepoError::Query(msg) => {
                AppError::Internal(format!("Document store error: {}", msg))
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::HashingError(msg) => AppError::Internal(msg),
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::TokenExpired => {
                AppError::Unauthorized("Token expired, please log in again".to_string())
            }
            AuthError::InvalidToken(_) | AuthError::MissingAuth => {
                AppError::Unauthorized("Authentication required".to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected(msg) => AppError::BadRequest(msg),
            err @ StorageError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::NotFound(id) => AppError::NotFound(format!("Object {} not found", id)),
            StorageError::Provider(msg) => AppError::Internal(format!("Object storage: {}", msg)),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
