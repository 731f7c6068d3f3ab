//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod account;
mod approval;
mod audit;
mod event;
mod request;

pub use account::{
    ACCOUNT_NAME_MAX_LENGTH, AccountName, account_name_violations, is_allowed_account_name,
};
pub use approval::ApprovalAction;
pub use audit::AuditAction;
pub use event::LifecycleEvent;
pub use request::{
    ALLOWED_GRANT_DURATIONS_MINUTES, Activation, DISPLAY_NAME_MAX_LENGTH, GrantDuration,
    PrivilegeRequest, PrivilegeRequestInput, PrivilegeRequestParts, REASON_MAX_LENGTH, RequestId,
    RequestStatus,
};
