use super::*;

impl PrivilegeLifecycleService {
    /// Removes rights from an `active` request and marks it `expired`.
    ///
    /// A request in any other status is left alone. A backend failure keeps
    /// the request `active` and is returned to the caller, unless the backend
    /// reports the account is no longer elevated. That happens when an
    /// earlier revoke reached the backend but never reached the store.
    pub async fn revoke(&self, id: RequestId, reason: &str) -> AppResult<Revocation> {
        let request = self.require_request(id).await?;
        if request.status() != RequestStatus::Active {
            info!(
                request_id = %id,
                status = %request.status(),
                "revoke skipped, request is not active"
            );
            return Ok(Revocation::Skipped {
                status: request.status(),
            });
        }

        let account = request.requester_identity().clone();
        if let Err(error) = self.backend.revoke(&account).await {
            if self.backend.is_elevated(&account).await.ok() == Some(false) {
                warn!(
                    request_id = %id,
                    account = %account,
                    error = %error,
                    "backend revoke failed but account is no longer elevated"
                );
            } else {
                error!(
                    request_id = %id,
                    account = %account,
                    error = %error,
                    security = true,
                    "privilege revocation failed, account remains elevated"
                );
                self.audit(
                    SYSTEM_SUBJECT,
                    AuditAction::BackendFailure,
                    id,
                    Some(format!("revoke: {error}")),
                )
                .await;
                return Err(error);
            }
        }

        let now = self.clock.now();
        let reason_owned = reason.to_owned();
        let updated = self
            .repository
            .update(
                id,
                Box::new(move |request| {
                    if request.status() == RequestStatus::Expired {
                        return Ok(MutationOutcome::Unchanged);
                    }
                    request.expire(reason_owned.as_str(), now)?;
                    Ok(MutationOutcome::Changed)
                }),
            )
            .await?;

        if updated.outcome == MutationOutcome::Unchanged {
            return Ok(Revocation::Skipped {
                status: updated.request.status(),
            });
        }

        info!(request_id = %id, account = %account, reason, "privileges revoked");
        self.audit(
            SYSTEM_SUBJECT,
            AuditAction::PrivilegeRevoked,
            id,
            Some(reason.to_owned()),
        )
        .await;
        self.publish(LifecycleEvent::RequestExpired { id }).await;

        Ok(Revocation::Revoked(updated.request))
    }
}
