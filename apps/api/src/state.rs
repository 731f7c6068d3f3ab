use std::sync::Arc;

use tempadmin_application::PrivilegeLifecycleService;
use tempadmin_infrastructure::{BroadcastApprovalNotifier, WebhookSigner};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: PrivilegeLifecycleService,
    pub live_events: BroadcastApprovalNotifier,
    pub webhook_signer: Option<WebhookSigner>,
    pub requester_secret: Arc<str>,
    pub dashboard_secret: Arc<str>,
}
