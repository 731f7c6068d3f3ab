//! SMTP approval notifier using the `lettre` crate.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tempadmin_application::ApprovalNotifier;
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::LifecycleEvent;

use crate::ApprovalLinkBuilder;

/// SMTP notifier configuration.
#[derive(Clone)]
pub struct SmtpNotifierConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender email address.
    pub from_address: String,
    /// Approver mailbox receiving new requests.
    pub approver_address: String,
}

/// Emails approvers a plain-text message with approve and deny links.
#[derive(Clone)]
pub struct SmtpApprovalNotifier {
    config: SmtpNotifierConfig,
    links: ApprovalLinkBuilder,
    dashboard_url: String,
}

impl SmtpApprovalNotifier {
    /// Creates an SMTP notifier.
    #[must_use]
    pub fn new(
        config: SmtpNotifierConfig,
        links: ApprovalLinkBuilder,
        dashboard_url: String,
    ) -> Self {
        Self {
            config,
            links,
            dashboard_url,
        }
    }

    fn compose(&self, event: &LifecycleEvent) -> AppResult<Option<(String, String)>> {
        let LifecycleEvent::NewRequest {
            id,
            requester_identity,
            display_name,
            duration_minutes,
            reason,
            approve_token,
            deny_token,
            ..
        } = event
        else {
            return Ok(None);
        };

        let subject = format!("Admin access requested by {requester_identity}");
        let body = format!(
            "{display_name} ({requester_identity}) requests administrator rights for {duration_minutes} minutes.\n\n\
             Reason: {reason}\n\n\
             Approve: {}\n\
             Deny: {}\n\n\
             Each link works once. Request {id} is also listed at {}.\n",
            self.links.link(approve_token)?,
            self.links.link(deny_token)?,
            self.dashboard_url
        );

        Ok(Some((subject, body)))
    }
}

#[async_trait]
impl ApprovalNotifier for SmtpApprovalNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        let Some((subject, body)) = self.compose(event)? else {
            return Ok(());
        };

        let from = self
            .config
            .from_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid from address: {error}")))?;

        let to_mailbox = self
            .config
            .approver_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid approver address: {error}")))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|error| AppError::Internal(format!("failed to build email: {error}")))?;

        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|error| {
                AppError::Internal(format!("failed to create SMTP transport: {error}"))
            })?
            .port(self.config.port)
            .credentials(credentials)
            .build();

        mailer
            .send(message)
            .await
            .map_err(|error| AppError::Internal(format!("failed to send email: {error}")))?;

        Ok(())
    }
}
