use super::*;

impl PrivilegeLifecycleService {
    /// Applies an approver decision to a `pending` request.
    pub async fn decide(
        &self,
        id: RequestId,
        decision: ApprovalAction,
        approver: Option<&str>,
    ) -> AppResult<PrivilegeRequest> {
        let now = self.clock.now();
        let approver_owned = approver.map(ToOwned::to_owned);
        let mutation_approver = approver_owned.clone();

        let updated = self
            .repository
            .update(
                id,
                Box::new(move |request| {
                    request.decide(decision, mutation_approver.as_deref(), now)?;
                    Ok(MutationOutcome::Changed)
                }),
            )
            .await?;
        let request = updated.request;

        // Sibling tokens must never authorize a second decision.
        if let Err(error) = self.token_issuer.invalidate_request(id) {
            warn!(request_id = %id, error = %error, "failed to invalidate sibling tokens");
        }

        info!(
            request_id = %id,
            decision = decision.as_str(),
            approver = approver.unwrap_or("token"),
            "privilege request decided"
        );
        let action = match decision {
            ApprovalAction::Approve => AuditAction::RequestApproved,
            ApprovalAction::Deny => AuditAction::RequestDenied,
        };
        self.audit(approver.unwrap_or("approval-link"), action, id, None)
            .await;
        self.publish(LifecycleEvent::RequestDecided {
            id,
            decision,
            approver_identity: approver_owned,
            decided_at: request.decided_at().unwrap_or(now),
        })
        .await;

        Ok(request)
    }

    /// Validates and consumes an approval token, then applies its decision.
    pub async fn decide_by_token(&self, token: &str) -> AppResult<PrivilegeRequest> {
        let grant = match self.token_issuer.validate(token) {
            Ok(grant) => grant,
            Err(error) => {
                if let AppError::Token(token_error) = &error {
                    warn!(code = token_error.code(), "approval token rejected");
                }
                return Err(error);
            }
        };

        self.decide(grant.request_id, grant.action, None).await
    }
}
