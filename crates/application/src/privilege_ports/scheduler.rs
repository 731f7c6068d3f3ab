use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempadmin_core::AppResult;
use tempadmin_domain::RequestId;

/// Port that arms one revocation timer per active request.
#[async_trait]
pub trait RevocationScheduler: Send + Sync {
    /// Arms a revocation at `expires_at`.
    ///
    /// Returns `false` when a timer is already armed for the request.
    async fn schedule(&self, id: RequestId, expires_at: DateTime<Utc>) -> AppResult<bool>;
}

/// What happened when an armed timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Privileges were revoked and the request expired.
    Revoked,
    /// The request was no longer active; nothing to do.
    AlreadyInactive,
    /// The stored deadline is still in the future.
    NotDue {
        /// Stored revocation deadline.
        expires_at: DateTime<Utc>,
    },
}

/// Callback side of the scheduler, implemented by the lifecycle service.
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    /// Revokes the request when its stored deadline has passed.
    ///
    /// An error means the request is still active and the revocation must
    /// be retried.
    async fn on_expiry(&self, id: RequestId) -> AppResult<ExpiryOutcome>;

    /// Publishes an advisory warning ahead of the deadline.
    async fn on_expiry_warning(&self, id: RequestId, expires_at: DateTime<Utc>) -> AppResult<()>;
}
