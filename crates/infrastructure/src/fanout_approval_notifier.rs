use std::sync::Arc;

use async_trait::async_trait;
use tempadmin_application::ApprovalNotifier;
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::LifecycleEvent;

/// Publishes each event to every inner notifier.
///
/// One failing channel does not stop delivery to the others.
#[derive(Clone, Default)]
pub struct FanoutApprovalNotifier {
    notifiers: Vec<Arc<dyn ApprovalNotifier>>,
}

impl FanoutApprovalNotifier {
    /// Creates an empty fan-out notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one delivery channel.
    #[must_use]
    pub fn with(mut self, notifier: Arc<dyn ApprovalNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

#[async_trait]
impl ApprovalNotifier for FanoutApprovalNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        let results =
            futures::future::join_all(self.notifiers.iter().map(|notifier| notifier.publish(event)))
                .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|result| result.err().map(|error| error.to_string()))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "{} approval channel(s) failed: {}",
                failures.len(),
                failures.join("; ")
            )))
        }
    }
}
