use async_trait::async_trait;
use tempadmin_core::AppResult;
use tempadmin_domain::LifecycleEvent;

/// Port for outbound approval channels.
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    /// Publishes one lifecycle event.
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()>;
}
