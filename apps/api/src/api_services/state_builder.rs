use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tempadmin_application::{
    ApprovalTokenIssuer, Clock, ExpirationService, PrivilegeLifecycleService,
    PrivilegeRequestRepository, SystemClock,
};
use tempadmin_core::{AppError, AppResult};
use tempadmin_infrastructure::{
    ApprovalLinkBuilder, BroadcastApprovalNotifier, FileStoreTimeouts, HmacApprovalTokenIssuer,
    JsonFileRequestStore, SchedulerSettings, TokioRevocationScheduler, TracingAuditRepository,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::backend::build_privilege_backend;
use super::notifiers::{build_notifier, build_webhook_signer};

const LIVE_EVENT_CAPACITY: usize = 256;

/// Services created once at startup.
pub struct ApiServices {
    pub state: AppState,
    pub expiration_service: ExpirationService,
    pub token_issuer: Arc<dyn ApprovalTokenIssuer>,
    pub scheduler_task: JoinHandle<()>,
}

/// Wires adapters into the lifecycle service and starts the revocation scheduler.
///
/// Must be called from within the tokio runtime.
pub fn build_api_services(config: &ApiConfig) -> AppResult<ApiServices> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let repository: Arc<dyn PrivilegeRequestRepository> = Arc::new(JsonFileRequestStore::new(
        config.store_path.clone(),
        FileStoreTimeouts {
            write_lock: StdDuration::from_millis(config.store_lock_timeout_ms),
            read_lock: StdDuration::from_millis(config.store_read_lock_timeout_ms),
        },
    ));
    info!(path = %config.store_path.display(), "using json file request store");

    let token_ttl = Duration::minutes(to_i64(
        "APPROVAL_TOKEN_TTL_MINUTES",
        config.approval_token_ttl_minutes,
    )?);
    let token_issuer: Arc<dyn ApprovalTokenIssuer> = Arc::new(HmacApprovalTokenIssuer::new(
        config.token_signing_secret.as_bytes().to_vec(),
        token_ttl,
        clock.clone(),
    )?);

    let links = ApprovalLinkBuilder::new(config.public_base_url.as_str())?;
    let live_events = BroadcastApprovalNotifier::new(LIVE_EVENT_CAPACITY);
    let webhook_signer = build_webhook_signer(config)?;
    let notifier = build_notifier(config, links, live_events.clone(), webhook_signer.clone())?;
    info!(notifier = config.notifier.name(), "approval notifier configured");

    let (scheduler, driver) = TokioRevocationScheduler::new(
        clock.clone(),
        SchedulerSettings {
            warning_lead: Duration::minutes(to_i64(
                "EXPIRY_WARNING_MINUTES",
                config.expiry_warning_minutes,
            )?),
            retry_interval: StdDuration::from_secs(config.revoke_retry_seconds),
        },
    );
    let scheduler = Arc::new(scheduler);

    let lifecycle = PrivilegeLifecycleService::new(
        repository.clone(),
        build_privilege_backend(config)?,
        token_issuer.clone(),
        notifier,
        scheduler.clone(),
        Arc::new(TracingAuditRepository::new()),
        clock.clone(),
    );
    let scheduler_task = driver.start(Arc::new(lifecycle.clone()));
    let expiration_service =
        ExpirationService::new(repository, lifecycle.clone(), scheduler, clock);

    Ok(ApiServices {
        state: AppState {
            lifecycle,
            live_events,
            webhook_signer,
            requester_secret: Arc::from(config.requester_shared_secret.as_str()),
            dashboard_secret: Arc::from(config.dashboard_shared_secret.as_str()),
        },
        expiration_service,
        token_issuer,
        scheduler_task,
    })
}

fn to_i64(key: &str, value: u64) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|_| AppError::validation(format!("{key} {value} is out of range")))
}
