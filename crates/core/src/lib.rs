//! Shared primitives for all Rust crates in tempadmin.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use thiserror::Error;

pub use auth::ApproverIdentity;

/// Result type used across tempadmin crates.
pub type AppResult<T> = Result<T, AppError>;

/// Approval token failures, surfaced distinctly to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TokenError {
    /// No token was supplied.
    #[error("approval token is missing")]
    Missing,

    /// Token is well formed and signed but not known to this process.
    #[error("approval token is unknown")]
    Unknown,

    /// Token is past its expiry.
    #[error("approval token has expired")]
    Expired,

    /// Token was already consumed by an earlier validation.
    #[error("approval token was already used")]
    AlreadyUsed,

    /// Token signature does not match its payload.
    #[error("approval token signature is invalid")]
    SignatureInvalid,

    /// Token could not be decoded.
    #[error("approval token is malformed")]
    Malformed,
}

impl TokenError {
    /// Returns the stable wire code for this failure.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "TOKEN_MISSING",
            Self::Unknown => "TOKEN_UNKNOWN",
            Self::Expired => "TOKEN_EXPIRED",
            Self::AlreadyUsed => "TOKEN_ALREADY_USED",
            Self::SignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            Self::Malformed => "TOKEN_MALFORMED",
        }
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input; carries every violated constraint.
    #[error("validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// State machine guard rejected the transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Approval token was rejected.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Privilege grant or revoke failed at the operating system layer.
    #[error("privilege backend error: {0}")]
    Backend(String),

    /// Persistence I/O or lock failure.
    #[error("store error: {0}")]
    Store(String),

    /// Caller is not authenticated for the surface it called.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a validation error carrying one violation.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// Returns true for outcomes the caller is expected to see verbatim.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Token(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, TokenError};

    #[test]
    fn validation_error_lists_every_violation() {
        let error = AppError::Validation(vec!["first".to_owned(), "second".to_owned()]);
        assert_eq!(error.to_string(), "validation error: first; second");
    }

    #[test]
    fn token_errors_expose_stable_codes() {
        assert_eq!(TokenError::AlreadyUsed.code(), "TOKEN_ALREADY_USED");
        assert_eq!(TokenError::SignatureInvalid.code(), "TOKEN_SIGNATURE_INVALID");
        assert_eq!(TokenError::Missing.code(), "TOKEN_MISSING");
    }

    #[test]
    fn token_error_converts_into_app_error() {
        let error: AppError = TokenError::Expired.into();
        assert!(matches!(error, AppError::Token(TokenError::Expired)));
        assert!(error.is_user_facing());
    }
}
