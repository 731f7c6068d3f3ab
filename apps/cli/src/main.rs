//! tempadmin requester CLI.

#![forbid(unsafe_code)]

use std::env;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::{Method, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempadmin_core::{AppError, AppResult};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct CliConfig {
    api_base_url: String,
    requester_shared_secret: String,
    timeout_seconds: u64,
}

/// Requests and activates temporary administrator rights.
#[derive(Debug, Parser)]
#[command(name = "tempadmin-cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum CliCommand {
    /// Submit a privilege request for approval
    Submit {
        /// Local account to elevate
        account: String,
        /// Grant duration in minutes (15, 30, 60, 120 or 240)
        minutes: u32,
        /// Name shown to approvers
        display_name: String,
        /// Why the rights are needed
        #[arg(required = true, num_args = 1..)]
        reason: Vec<String>,
    },
    /// Activate an approved request
    Activate {
        /// Request identifier returned by `submit`
        request_id: String,
    },
    /// Show the current state of a request
    Status {
        /// Request identifier returned by `submit`
        request_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct SubmitPrivilegeRequest {
    requester_identity: String,
    display_name: String,
    duration_minutes: u32,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    violations: Vec<String>,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = Cli::parse().command;
    let config = CliConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let response = execute(&http_client, &config, &command).await?;
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|error| AppError::Internal(format!("failed to render response: {error}")))?;
    println!("{rendered}");

    Ok(())
}

impl CliCommand {
    fn submit_payload(&self) -> Option<SubmitPrivilegeRequest> {
        match self {
            Self::Submit {
                account,
                minutes,
                display_name,
                reason,
            } => Some(SubmitPrivilegeRequest {
                requester_identity: account.clone(),
                display_name: display_name.clone(),
                duration_minutes: *minutes,
                reason: reason.join(" "),
            }),
            Self::Activate { .. } | Self::Status { .. } => None,
        }
    }

    fn route(&self) -> (Method, String) {
        match self {
            Self::Submit { .. } => (Method::POST, "/api/requests".to_owned()),
            Self::Activate { request_id } => (
                Method::POST,
                format!("/api/requests/{request_id}/activate"),
            ),
            Self::Status { request_id } => (Method::GET, format!("/api/requests/{request_id}")),
        }
    }
}

async fn execute(
    http_client: &reqwest::Client,
    config: &CliConfig,
    command: &CliCommand,
) -> AppResult<Value> {
    let (method, path) = command.route();
    let endpoint = format!("{}{path}", config.api_base_url);
    debug!(method = %method, endpoint = %endpoint, "calling tempadmin api");

    let mut request = http_client.request(method, endpoint.as_str()).header(
        header::AUTHORIZATION,
        format!("Bearer {}", config.requester_shared_secret),
    );
    if let Some(payload) = command.submit_payload() {
        request = request.json(&payload);
    }

    let response = request
        .send()
        .await
        .map_err(|error| AppError::Internal(format!("failed to call {endpoint}: {error}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_owned());
    if !status.is_success() {
        return Err(error_from_response(status, body.as_str()));
    }

    serde_json::from_str(body.as_str()).map_err(|error| {
        AppError::Internal(format!("failed to parse api response body: {error}"))
    })
}

fn error_from_response(status: StatusCode, body: &str) -> AppError {
    let payload: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let message = if payload.message.is_empty() {
        body.to_owned()
    } else {
        payload.message
    };

    match status {
        StatusCode::BAD_REQUEST if !payload.violations.is_empty() => {
            AppError::Validation(payload.violations)
        }
        StatusCode::BAD_REQUEST => match payload.code {
            Some(code) => AppError::validation(format!("{code}: {message}")),
            None => AppError::validation(message),
        },
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::InvalidTransition(message),
        status => AppError::Internal(format!(
            "api returned status {}: {message}",
            status.as_u16()
        )),
    }
}

impl CliConfig {
    fn load() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("TEMPADMIN_API_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3001".to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();
        let requester_shared_secret = lookup("REQUESTER_SHARED_SECRET")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::validation("REQUESTER_SHARED_SECRET is required"))?;
        let timeout_seconds = match lookup("TEMPADMIN_CLI_TIMEOUT_SECONDS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::validation(format!(
                    "invalid TEMPADMIN_CLI_TIMEOUT_SECONDS value '{value}': {error}"
                ))
            })?,
            None => 15,
        };

        if timeout_seconds == 0 {
            return Err(AppError::validation(
                "TEMPADMIN_CLI_TIMEOUT_SECONDS must be greater than zero",
            ));
        }

        Ok(Self {
            api_base_url,
            requester_shared_secret,
            timeout_seconds,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
