//! Privilege lifecycle use-cases.
//!
//! Every transition goes through [`PrivilegeRequestRepository::update`], so
//! the guard runs against the latest stored status and replays become
//! rejected no-ops. Backend calls happen outside the store lock.

use std::sync::Arc;

use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{
    Activation, ApprovalAction, AuditAction, LifecycleEvent, PrivilegeRequest,
    PrivilegeRequestInput, RequestId, RequestStatus,
};
use tracing::{error, info, warn};

use crate::privilege_ports::{
    ApprovalNotifier, ApprovalTokenIssuer, AuditEvent, AuditRepository, Clock, IssuedToken,
    MutationOutcome, PrivilegeBackend, PrivilegeRequestRepository, RevocationScheduler,
};

mod activate;
mod decide;
mod expiry;
mod queries;
mod revoke;
mod submit;

/// Audit subject used for scheduler-driven transitions.
pub const SYSTEM_SUBJECT: &str = "system";

/// Revocation reason recorded when the grant deadline passes.
pub const EXPIRED_REASON: &str = "grant expired";

/// Submitted request together with its two approval tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRequest {
    /// Persisted `pending` request.
    pub request: PrivilegeRequest,
    /// Token that approves the request.
    pub approve_token: IssuedToken,
    /// Token that denies the request.
    pub deny_token: IssuedToken,
}

/// Request projection enriched with the backend's live view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStatusView {
    /// Stored request.
    pub request: PrivilegeRequest,
    /// Whether the backend reports elevated rights, when it could be asked.
    pub is_elevated: Option<bool>,
}

/// Outcome of a revoke call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revocation {
    /// Rights were removed and the request is now `expired`.
    Revoked(PrivilegeRequest),
    /// The request was not `active`, or a concurrent revoke expired it first.
    Skipped {
        /// Status found in the store.
        status: RequestStatus,
    },
}

/// Application service driving the privilege request state machine.
#[derive(Clone)]
pub struct PrivilegeLifecycleService {
    repository: Arc<dyn PrivilegeRequestRepository>,
    backend: Arc<dyn PrivilegeBackend>,
    token_issuer: Arc<dyn ApprovalTokenIssuer>,
    notifier: Arc<dyn ApprovalNotifier>,
    scheduler: Arc<dyn RevocationScheduler>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl PrivilegeLifecycleService {
    /// Creates a lifecycle service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PrivilegeRequestRepository>,
        backend: Arc<dyn PrivilegeBackend>,
        token_issuer: Arc<dyn ApprovalTokenIssuer>,
        notifier: Arc<dyn ApprovalNotifier>,
        scheduler: Arc<dyn RevocationScheduler>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            backend,
            token_issuer,
            notifier,
            scheduler,
            audit_repository,
            clock,
        }
    }

    async fn require_request(&self, id: RequestId) -> AppResult<PrivilegeRequest> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("privilege request '{id}' does not exist")))
    }

    async fn publish(&self, event: LifecycleEvent) {
        if let Err(error) = self.notifier.publish(&event).await {
            warn!(
                request_id = %event.request_id(),
                event = event.kind(),
                error = %error,
                "approval channel failed to deliver lifecycle event"
            );
        }
    }

    async fn audit(
        &self,
        subject: &str,
        action: AuditAction,
        request_id: RequestId,
        detail: Option<String>,
    ) {
        let event = AuditEvent {
            subject: subject.to_owned(),
            action,
            request_id,
            detail,
        };

        if let Err(error) = self.audit_repository.append_event(event).await {
            error!(
                request_id = %request_id,
                action = action.as_str(),
                error = %error,
                "failed to append audit event"
            );
        }
    }
}
