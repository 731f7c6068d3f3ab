use super::*;

impl PrivilegeLifecycleService {
    /// Validates and persists a new request, then issues its approval tokens.
    ///
    /// All validation failures are reported together.
    pub async fn submit(&self, input: PrivilegeRequestInput) -> AppResult<SubmittedRequest> {
        let request = PrivilegeRequest::submit(input, self.clock.now())?;
        self.repository.create(request.clone()).await?;

        let approve_token = self
            .token_issuer
            .issue(request.id(), ApprovalAction::Approve)?;
        let deny_token = self.token_issuer.issue(request.id(), ApprovalAction::Deny)?;

        info!(
            request_id = %request.id(),
            account = %request.requester_identity(),
            duration_minutes = request.duration().minutes(),
            "privilege request submitted"
        );
        self.audit(
            request.requester_identity().as_str(),
            AuditAction::RequestSubmitted,
            request.id(),
            Some(format!("duration_minutes={}", request.duration().minutes())),
        )
        .await;
        self.publish(LifecycleEvent::new_request(
            &request,
            approve_token.token.as_str(),
            deny_token.token.as_str(),
        ))
        .await;

        Ok(SubmittedRequest {
            request,
            approve_token,
            deny_token,
        })
    }
}
