use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tempadmin_core::AppError;
use tracing::{error, warn};

mod types;

pub use types::ErrorResponse;

const GENERIC_REQUEST_FAILURE: &str = "request failed";

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    /// Maps the error to its status code and the body callers are allowed to see.
    fn status_and_payload(self) -> (StatusCode, ErrorResponse) {
        match self.0 {
            AppError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("validation failed").with_violations(violations),
            ),
            AppError::Token(token_error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(token_error.to_string()).with_code(token_error.code()),
            ),
            AppError::NotFound(detail) => {
                warn!(detail = %detail, "resource not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new(GENERIC_REQUEST_FAILURE),
                )
            }
            AppError::InvalidTransition(detail) => {
                warn!(detail = %detail, "transition rejected");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(GENERIC_REQUEST_FAILURE),
                )
            }
            AppError::Unauthorized(detail) => {
                warn!(detail = %detail, "unauthorized request");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("unauthorized"),
                )
            }
            AppError::Store(detail) => {
                error!(detail = %detail, "request store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("service unavailable"),
                )
            }
            AppError::Backend(detail) => {
                error!(detail = %detail, security = true, "privilege backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal error"),
                )
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal error"),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = self.status_and_payload();
        (status, Json(payload)).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
