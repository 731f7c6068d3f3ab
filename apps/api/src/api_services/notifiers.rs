use std::sync::Arc;
use std::time::Duration;

use tempadmin_application::ApprovalNotifier;
use tempadmin_core::{AppError, AppResult};
use tempadmin_infrastructure::{
    ApprovalLinkBuilder, BroadcastApprovalNotifier, ConsoleApprovalNotifier,
    FanoutApprovalNotifier, SmtpApprovalNotifier, SmtpNotifierConfig, WebhookApprovalNotifier,
    WebhookSigner,
};

use crate::api_config::{ApiConfig, NotifierConfig};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the configured outbound notifier, always paired with the live dashboard feed.
pub(super) fn build_notifier(
    config: &ApiConfig,
    links: ApprovalLinkBuilder,
    live_events: BroadcastApprovalNotifier,
    webhook_signer: Option<WebhookSigner>,
) -> AppResult<Arc<dyn ApprovalNotifier>> {
    let outbound: Arc<dyn ApprovalNotifier> = match &config.notifier {
        NotifierConfig::Console => Arc::new(ConsoleApprovalNotifier::new(links)),
        NotifierConfig::Webhook { url, .. } => {
            let signer = webhook_signer.ok_or_else(|| {
                AppError::Internal("webhook notifier configured without a signer".to_owned())
            })?;
            let http_client = reqwest::Client::builder()
                .timeout(WEBHOOK_TIMEOUT)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build webhook http client: {error}"))
                })?;
            Arc::new(WebhookApprovalNotifier::new(
                http_client,
                url.clone(),
                signer,
                config.webhook_max_attempts,
                config.webhook_retry_backoff_ms,
            ))
        }
        NotifierConfig::Smtp(smtp) => Arc::new(SmtpApprovalNotifier::new(
            SmtpNotifierConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from_address: smtp.from_address.clone(),
                approver_address: smtp.approver_address.clone(),
            },
            links,
            config.dashboard_url.clone(),
        )),
    };

    Ok(Arc::new(
        FanoutApprovalNotifier::new()
            .with(outbound)
            .with(Arc::new(live_events)),
    ))
}

pub(super) fn build_webhook_signer(config: &ApiConfig) -> AppResult<Option<WebhookSigner>> {
    match &config.notifier {
        NotifierConfig::Webhook { secret, .. } => {
            WebhookSigner::new(secret.as_bytes().to_vec()).map(Some)
        }
        NotifierConfig::Console | NotifierConfig::Smtp(_) => Ok(None),
    }
}
