use tempadmin_domain::AccountName;

use super::*;

impl PrivilegeLifecycleService {
    /// Grants rights for an `approved` request and arms its revocation.
    ///
    /// Activating an `active` request returns the stored deadline without
    /// touching the backend.
    pub async fn activate(&self, id: RequestId) -> AppResult<Activation> {
        let request = self.require_request(id).await?;
        match request.status() {
            RequestStatus::Approved => {}
            RequestStatus::Active => {
                let mut current = request;
                return current.activate(self.clock.now());
            }
            status => {
                return Err(AppError::InvalidTransition(format!(
                    "request '{id}' cannot be activated from status '{status}'"
                )));
            }
        }

        let account = request.requester_identity().clone();
        if let Err(error) = self.backend.grant(&account).await {
            error!(request_id = %id, account = %account, error = %error, "privilege grant failed");
            self.audit(
                SYSTEM_SUBJECT,
                AuditAction::BackendFailure,
                id,
                Some(format!("grant: {error}")),
            )
            .await;
            return Err(error);
        }

        let now = self.clock.now();
        let updated = self
            .repository
            .update(
                id,
                Box::new(move |request| match request.activate(now)? {
                    Activation::Activated { .. } => Ok(MutationOutcome::Changed),
                    Activation::AlreadyActive { .. } => Ok(MutationOutcome::Unchanged),
                }),
            )
            .await;

        let updated = match updated {
            Ok(updated) => updated,
            Err(error) => {
                if let Ok(Some(stored)) = self.repository.find_by_id(id).await
                    && stored.status() == RequestStatus::Active
                    && let Some(expires_at) = stored.expires_at()
                {
                    warn!(
                        request_id = %id,
                        error = %error,
                        "activation write failed but a concurrent activation is stored"
                    );
                    return Ok(Activation::AlreadyActive { expires_at });
                }

                // The grant must not outlive a record that never became active.
                error!(
                    request_id = %id,
                    error = %error,
                    "failed to persist activation, withdrawing grant"
                );
                self.withdraw_grant(id, &account).await;
                return Err(error);
            }
        };

        let expires_at = updated.request.expires_at().ok_or_else(|| {
            AppError::Internal(format!("active request '{id}' has no expiry deadline"))
        })?;

        if updated.outcome == MutationOutcome::Unchanged {
            return Ok(Activation::AlreadyActive { expires_at });
        }

        self.scheduler.schedule(id, expires_at).await?;

        info!(
            request_id = %id,
            account = %account,
            expires_at = %expires_at,
            "privileges granted"
        );
        self.audit(
            account.as_str(),
            AuditAction::PrivilegeGranted,
            id,
            Some(format!("expires_at={}", expires_at.to_rfc3339())),
        )
        .await;
        self.publish(LifecycleEvent::RequestActivated { id, expires_at })
            .await;

        Ok(Activation::Activated { expires_at })
    }

    async fn withdraw_grant(&self, id: RequestId, account: &AccountName) {
        let Err(revoke_error) = self.backend.revoke(account).await else {
            return;
        };
        if self.backend.is_elevated(account).await.ok() == Some(false) {
            return;
        }

        error!(
            request_id = %id,
            account = %account,
            error = %revoke_error,
            security = true,
            "failed to withdraw grant after persistence failure"
        );
    }
}
