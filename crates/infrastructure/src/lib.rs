//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod approval_links;
mod broadcast_approval_notifier;
mod command_privilege_backend;
mod console_approval_notifier;
mod fanout_approval_notifier;
mod hmac_approval_token_issuer;
mod in_memory_privilege_backend;
mod in_memory_request_store;
mod json_file_request_store;
mod smtp_approval_notifier;
mod tokio_revocation_scheduler;
mod tracing_audit_repository;
mod webhook_approval_notifier;
mod webhook_signature;

#[cfg(test)]
mod test_clock;

pub use approval_links::ApprovalLinkBuilder;
pub use broadcast_approval_notifier::BroadcastApprovalNotifier;
pub use command_privilege_backend::{
    CommandPrivilegeBackend, CommandRunner, HostPlatform, Invocation, ProcessRunner,
};
pub use console_approval_notifier::ConsoleApprovalNotifier;
pub use fanout_approval_notifier::FanoutApprovalNotifier;
pub use hmac_approval_token_issuer::{
    DEFAULT_TOKEN_TTL_MINUTES, HmacApprovalTokenIssuer, MIN_SECRET_LENGTH,
};
pub use in_memory_privilege_backend::InMemoryPrivilegeBackend;
pub use in_memory_request_store::InMemoryRequestStore;
pub use json_file_request_store::{FileStoreTimeouts, JsonFileRequestStore};
pub use smtp_approval_notifier::{SmtpApprovalNotifier, SmtpNotifierConfig};
pub use tokio_revocation_scheduler::{
    RevocationSchedulerDriver, SchedulerSettings, TokioRevocationScheduler,
};
pub use tracing_audit_repository::TracingAuditRepository;
pub use webhook_approval_notifier::WebhookApprovalNotifier;
pub use webhook_signature::{MIN_WEBHOOK_SECRET_LENGTH, SIGNATURE_HEADER, WebhookSigner};
