use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::privilege_ports::{ExpiryHandler, ExpiryOutcome};

use super::*;

#[async_trait]
impl ExpiryHandler for PrivilegeLifecycleService {
    async fn on_expiry(&self, id: RequestId) -> AppResult<ExpiryOutcome> {
        let request = self.require_request(id).await?;
        if request.status() != RequestStatus::Active {
            return Ok(ExpiryOutcome::AlreadyInactive);
        }

        if let Some(expires_at) = request.expires_at()
            && expires_at > self.clock.now()
        {
            return Ok(ExpiryOutcome::NotDue { expires_at });
        }

        match self.revoke(id, EXPIRED_REASON).await? {
            Revocation::Revoked(_) => Ok(ExpiryOutcome::Revoked),
            Revocation::Skipped { .. } => Ok(ExpiryOutcome::AlreadyInactive),
        }
    }

    async fn on_expiry_warning(&self, id: RequestId, expires_at: DateTime<Utc>) -> AppResult<()> {
        let request = self.require_request(id).await?;
        if request.status() != RequestStatus::Active || request.expires_at() != Some(expires_at) {
            return Ok(());
        }

        self.publish(LifecycleEvent::ExpiryWarning { id, expires_at })
            .await;
        Ok(())
    }
}
