use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by lifecycle use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a request is submitted.
    RequestSubmitted,
    /// Emitted when a request is approved.
    RequestApproved,
    /// Emitted when a request is denied.
    RequestDenied,
    /// Emitted when privileges are granted.
    PrivilegeGranted,
    /// Emitted when privileges are revoked.
    PrivilegeRevoked,
    /// Emitted when a grant or revoke attempt fails at the backend.
    BackendFailure,
    /// Emitted when an approval token is rejected.
    TokenRejected,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSubmitted => "privilege.request.submitted",
            Self::RequestApproved => "privilege.request.approved",
            Self::RequestDenied => "privilege.request.denied",
            Self::PrivilegeGranted => "privilege.grant.applied",
            Self::PrivilegeRevoked => "privilege.grant.revoked",
            Self::BackendFailure => "privilege.backend.failed",
            Self::TokenRejected => "approval.token.rejected",
        }
    }
}
