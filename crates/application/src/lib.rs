//! Application services and ports.

#![forbid(unsafe_code)]

mod expiration_service;
mod privilege_lifecycle_service;
mod privilege_ports;

#[cfg(test)]
mod test_support;

pub use expiration_service::{ExpirationService, RecoveryReport};
pub use privilege_lifecycle_service::{
    EXPIRED_REASON, PrivilegeLifecycleService, RequestStatusView, Revocation, SYSTEM_SUBJECT,
    SubmittedRequest,
};
pub use privilege_ports::{
    ApprovalNotifier, ApprovalTokenIssuer, AuditEvent, AuditRepository, Clock, ExpiryHandler,
    ExpiryOutcome, IssuedToken, MutationOutcome, PrivilegeBackend, PrivilegeRequestRepository,
    RequestMutation, RevocationScheduler, SystemClock, TokenGrant, UpdatedRequest,
};
