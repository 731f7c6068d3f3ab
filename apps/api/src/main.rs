//! tempadmin API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::time::Duration;

use tempadmin_core::{AppError, AppResult};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_services::{build_api_services, spawn_token_sweeper};

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let services = build_api_services(&config)?;

    // Overdue grants are revoked before the listener accepts anything.
    let report = services.expiration_service.recover_all().await?;
    info!(
        revoked = report.revoked,
        scheduled = report.scheduled,
        failed = report.failed,
        "startup recovery finished"
    );
    if report.failed > 0 {
        warn!(
            failed = report.failed,
            security = true,
            "overdue grants could not be revoked at startup, retries are scheduled"
        );
    }

    let _token_sweeper = spawn_token_sweeper(
        services.token_issuer.clone(),
        Duration::from_secs(config.token_sweep_interval_seconds),
    );

    let app = api_router::build_router(services.state, config.dashboard_url.as_str())?;
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, "tempadmin api listening");
    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))?;

    services.scheduler_task.abort();
    Ok(())
}
