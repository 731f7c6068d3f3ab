use std::sync::Arc;

use tempadmin_core::AppResult;
use tempadmin_domain::RequestStatus;
use tracing::{error, info, warn};

use crate::privilege_lifecycle_service::{EXPIRED_REASON, PrivilegeLifecycleService, Revocation};
use crate::privilege_ports::{Clock, PrivilegeRequestRepository, RevocationScheduler};

/// Summary of one restart recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Overdue grants revoked during recovery.
    pub revoked: usize,
    /// Timers re-armed for grants still in the future.
    pub scheduled: usize,
    /// Overdue grants whose revocation failed and were handed to the scheduler for retry.
    pub failed: usize,
}

/// Rebuilds revocation timers from persisted deadlines.
#[derive(Clone)]
pub struct ExpirationService {
    repository: Arc<dyn PrivilegeRequestRepository>,
    lifecycle: PrivilegeLifecycleService,
    scheduler: Arc<dyn RevocationScheduler>,
    clock: Arc<dyn Clock>,
}

impl ExpirationService {
    /// Creates an expiration service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PrivilegeRequestRepository>,
        lifecycle: PrivilegeLifecycleService,
        scheduler: Arc<dyn RevocationScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            scheduler,
            clock,
        }
    }

    /// Revokes overdue grants and arms timers for every other active request.
    ///
    /// Must complete before the process accepts requests.
    pub async fn recover_all(&self) -> AppResult<RecoveryReport> {
        let now = self.clock.now();
        let mut report = RecoveryReport::default();

        for request in self.repository.list_all().await? {
            if request.status() != RequestStatus::Active {
                continue;
            }

            let id = request.id();
            let Some(expires_at) = request.expires_at() else {
                warn!(request_id = %id, "active request without deadline skipped during recovery");
                continue;
            };

            if expires_at > now {
                self.scheduler.schedule(id, expires_at).await?;
                report.scheduled += 1;
                continue;
            }

            match self.lifecycle.revoke(id, EXPIRED_REASON).await {
                Ok(Revocation::Revoked(_)) => report.revoked += 1,
                Ok(Revocation::Skipped { .. }) => {}
                Err(revoke_error) => {
                    error!(
                        request_id = %id,
                        error = %revoke_error,
                        security = true,
                        "overdue grant could not be revoked during recovery, retrying"
                    );
                    self.scheduler.schedule(id, expires_at).await?;
                    report.failed += 1;
                }
            }
        }

        info!(
            revoked = report.revoked,
            scheduled = report.scheduled,
            failed = report.failed,
            "expiration recovery complete"
        );
        Ok(report)
    }
}
