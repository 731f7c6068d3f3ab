//! Console notifier for development. Logs lifecycle events to tracing output.

use async_trait::async_trait;
use tempadmin_application::ApprovalNotifier;
use tempadmin_core::AppResult;
use tempadmin_domain::LifecycleEvent;
use tracing::info;

use crate::ApprovalLinkBuilder;

/// Development notifier that prints approval links to the console.
#[derive(Debug, Clone)]
pub struct ConsoleApprovalNotifier {
    links: ApprovalLinkBuilder,
}

impl ConsoleApprovalNotifier {
    /// Creates a console notifier.
    #[must_use]
    pub fn new(links: ApprovalLinkBuilder) -> Self {
        Self { links }
    }
}

#[async_trait]
impl ApprovalNotifier for ConsoleApprovalNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        match event {
            LifecycleEvent::NewRequest {
                id,
                requester_identity,
                display_name,
                duration_minutes,
                reason,
                approve_token,
                deny_token,
                ..
            } => {
                info!(
                    request_id = %id,
                    "--- APPROVAL REQUEST (console) ---\nAccount: {} ({})\nDuration: {} minutes\nReason: {}\nApprove: {}\nDeny: {}\n--- END APPROVAL REQUEST ---",
                    requester_identity,
                    display_name,
                    duration_minutes,
                    reason,
                    self.links.link(approve_token)?,
                    self.links.link(deny_token)?
                );
            }
            other => {
                info!(request_id = %other.request_id(), event = other.kind(), "lifecycle event");
            }
        }

        Ok(())
    }
}
