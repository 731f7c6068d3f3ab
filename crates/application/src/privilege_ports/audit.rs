use async_trait::async_trait;
use tempadmin_core::AppResult;
use tempadmin_domain::{AuditAction, RequestId};

/// Immutable audit event payload emitted by lifecycle services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Subject that performed the action: requester, approver or `system`.
    pub subject: String,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Request the event refers to.
    pub request_id: RequestId,
    /// Optional audit detail payload.
    pub detail: Option<String>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
