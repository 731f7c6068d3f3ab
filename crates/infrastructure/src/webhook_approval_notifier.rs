use std::time::Duration;

use async_trait::async_trait;
use tempadmin_application::ApprovalNotifier;
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::LifecycleEvent;

use crate::webhook_signature::{SIGNATURE_HEADER, WebhookSigner};

/// Posts signed lifecycle events to an external approval channel.
pub struct WebhookApprovalNotifier {
    http_client: reqwest::Client,
    endpoint: String,
    signer: WebhookSigner,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl WebhookApprovalNotifier {
    /// Creates a webhook notifier.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: String,
        signer: WebhookSigner,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            signer,
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }
}

#[async_trait]
impl ApprovalNotifier for WebhookApprovalNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        let body = serde_json::to_vec(event).map_err(|error| {
            AppError::Internal(format!("failed to encode lifecycle event: {error}"))
        })?;
        let signature = self.signer.sign(&body)?;

        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.as_str())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, signature.as_str())
                .header("X-Tempadmin-Event", event.kind())
                .body(body.clone())
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} delivering '{}' event",
                        response.status(),
                        event.kind()
                    ));
                }
                Ok(response) => {
                    return Err(AppError::Internal(format!(
                        "webhook rejected '{}' event with status {}",
                        event.kind(),
                        response.status()
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("webhook transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "webhook delivery exhausted retries".to_owned()
        })))
    }
}
