use async_trait::async_trait;
use tempadmin_application::{AuditEvent, AuditRepository};
use tempadmin_core::AppResult;
use tracing::info;

/// Audit adapter that writes events to the `tempadmin::audit` tracing target.
///
/// Route that target to durable storage through the subscriber configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditRepository;

impl TracingAuditRepository {
    /// Creates a tracing audit repository.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditRepository for TracingAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        info!(
            target: "tempadmin::audit",
            subject = %event.subject,
            action = event.action.as_str(),
            request_id = %event.request_id,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );

        Ok(())
    }
}
