use async_trait::async_trait;
use tempadmin_application::ApprovalNotifier;
use tempadmin_core::AppResult;
use tempadmin_domain::LifecycleEvent;
use tokio::sync::broadcast;

/// In-process fan-out of lifecycle events to live dashboard subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastApprovalNotifier {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastApprovalNotifier {
    /// Creates a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl ApprovalNotifier for BroadcastApprovalNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        // No subscribers is not an error.
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}
