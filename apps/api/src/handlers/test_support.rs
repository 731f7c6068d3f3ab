use std::sync::Arc;

use chrono::Duration;
use tempadmin_application::{
    ApprovalTokenIssuer, Clock, PrivilegeLifecycleService, SubmittedRequest, SystemClock,
};
use tempadmin_core::AppResult;
use tempadmin_domain::{ApprovalAction, RequestId};
use tempadmin_infrastructure::{
    BroadcastApprovalNotifier, HmacApprovalTokenIssuer, InMemoryPrivilegeBackend,
    InMemoryRequestStore, SchedulerSettings, TokioRevocationScheduler, TracingAuditRepository,
    WebhookSigner,
};

use crate::dto::SubmitPrivilegeRequest;
use crate::state::AppState;

pub const WEBHOOK_SECRET: &[u8] = b"webhook-secret-webhook-secret-0001";

pub fn submit_payload(identity: &str) -> SubmitPrivilegeRequest {
    SubmitPrivilegeRequest {
        requester_identity: identity.to_owned(),
        display_name: "Alice Example".to_owned(),
        duration_minutes: 30,
        reason: "rotate the TLS certificates".to_owned(),
    }
}

/// In-memory application wired the way the composition root wires it.
pub struct TestApp {
    pub state: AppState,
    pub signer: WebhookSigner,
}

impl TestApp {
    /// Must be called inside a tokio runtime.
    pub fn new() -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let token_issuer: Arc<dyn ApprovalTokenIssuer> = Arc::new(HmacApprovalTokenIssuer::new(
            b"signing-secret-signing-secret-0001".to_vec(),
            Duration::minutes(15),
            clock.clone(),
        )?);
        let live_events = BroadcastApprovalNotifier::new(16);
        let (scheduler, driver) =
            TokioRevocationScheduler::new(clock.clone(), SchedulerSettings::default());

        let lifecycle = PrivilegeLifecycleService::new(
            Arc::new(InMemoryRequestStore::new()),
            Arc::new(InMemoryPrivilegeBackend::new()),
            token_issuer,
            Arc::new(live_events.clone()),
            Arc::new(scheduler),
            Arc::new(TracingAuditRepository::new()),
            clock,
        );
        driver.start(Arc::new(lifecycle.clone()));

        let signer = WebhookSigner::new(WEBHOOK_SECRET)?;
        Ok(Self {
            state: AppState {
                lifecycle,
                live_events,
                webhook_signer: Some(signer.clone()),
                requester_secret: Arc::from("r".repeat(32).as_str()),
                dashboard_secret: Arc::from("d".repeat(32).as_str()),
            },
            signer,
        })
    }

    pub async fn submit_with_tokens(&self, identity: &str) -> AppResult<SubmittedRequest> {
        self.state.lifecycle.submit(submit_payload(identity).into()).await
    }

    pub async fn submit(&self, identity: &str) -> AppResult<RequestId> {
        Ok(self.submit_with_tokens(identity).await?.request.id())
    }

    pub async fn active(&self, identity: &str) -> AppResult<RequestId> {
        let id = self.submit(identity).await?;
        self.state
            .lifecycle
            .decide(id, ApprovalAction::Approve, Some("carol"))
            .await?;
        self.state.lifecycle.activate(id).await?;
        Ok(id)
    }
}
