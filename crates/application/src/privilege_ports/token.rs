use chrono::{DateTime, Utc};
use tempadmin_core::AppResult;
use tempadmin_domain::{ApprovalAction, RequestId};

/// Freshly issued single-use approval token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token value embedded in approval links.
    pub token: String,
    /// Action the token authorizes.
    pub action: ApprovalAction,
    /// Instant after which the token is rejected.
    pub expires_at: DateTime<Utc>,
}

/// Authorization carried by a successfully validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenGrant {
    /// Request the token decides.
    pub request_id: RequestId,
    /// Decision the token authorizes.
    pub action: ApprovalAction,
}

/// Port for issuing and consuming approval tokens.
///
/// Failures are reported as [`tempadmin_core::AppError::Token`].
pub trait ApprovalTokenIssuer: Send + Sync {
    /// Issues a token bound to one request and one action.
    fn issue(&self, request_id: RequestId, action: ApprovalAction) -> AppResult<IssuedToken>;

    /// Validates and consumes a token.
    fn validate(&self, token: &str) -> AppResult<TokenGrant>;

    /// Marks every outstanding token of a request as used.
    fn invalidate_request(&self, request_id: RequestId) -> AppResult<usize>;

    /// Drops tokens whose expiry has passed and returns how many were removed.
    fn sweep_expired(&self) -> AppResult<usize>;
}
