use std::sync::Arc;
use std::time::Duration;

use tempadmin_application::ApprovalTokenIssuer;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Periodically drops expired approval tokens from the issuer's ledger.
pub fn spawn_token_sweeper(
    token_issuer: Arc<dyn ApprovalTokenIssuer>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "approval token sweeper started");

        loop {
            tokio::time::sleep(interval).await;
            match token_issuer.sweep_expired() {
                Ok(0) => {}
                Ok(swept) => debug!(swept, "expired approval tokens swept"),
                Err(sweep_error) => {
                    error!(error = %sweep_error, "approval token sweep failed");
                }
            }
        }
    })
}
