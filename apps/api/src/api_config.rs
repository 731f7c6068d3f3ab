use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use tempadmin_core::{AppError, AppResult};
use tempadmin_infrastructure::{MIN_SECRET_LENGTH, MIN_WEBHOOK_SECRET_LENGTH};
use tracing_subscriber::EnvFilter;

const MIN_BEARER_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub approver_address: String,
}

#[derive(Debug, Clone)]
pub enum NotifierConfig {
    Console,
    Webhook { url: String, secret: String },
    Smtp(SmtpRuntimeConfig),
}

impl NotifierConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Webhook { .. } => "webhook",
            Self::Smtp(_) => "smtp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    Command { admin_group: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub store_path: PathBuf,
    pub token_signing_secret: String,
    pub approval_token_ttl_minutes: u64,
    pub token_sweep_interval_seconds: u64,
    pub expiry_warning_minutes: u64,
    pub revoke_retry_seconds: u64,
    pub store_lock_timeout_ms: u64,
    pub store_read_lock_timeout_ms: u64,
    pub api_host: String,
    pub api_port: u16,
    pub public_base_url: String,
    pub dashboard_url: String,
    pub requester_shared_secret: String,
    pub dashboard_shared_secret: String,
    pub backend: BackendConfig,
    pub notifier: NotifierConfig,
    pub webhook_max_attempts: u8,
    pub webhook_retry_backoff_ms: u64,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = EnvReader { lookup };

        let token_signing_secret = vars.required("TOKEN_SIGNING_SECRET")?;
        require_min_length("TOKEN_SIGNING_SECRET", &token_signing_secret, MIN_SECRET_LENGTH)?;
        let requester_shared_secret = vars.required("REQUESTER_SHARED_SECRET")?;
        require_min_length(
            "REQUESTER_SHARED_SECRET",
            &requester_shared_secret,
            MIN_BEARER_SECRET_LENGTH,
        )?;
        let dashboard_shared_secret = vars.required("DASHBOARD_SHARED_SECRET")?;
        require_min_length(
            "DASHBOARD_SHARED_SECRET",
            &dashboard_shared_secret,
            MIN_BEARER_SECRET_LENGTH,
        )?;
        if requester_shared_secret == dashboard_shared_secret {
            return Err(AppError::validation(
                "REQUESTER_SHARED_SECRET and DASHBOARD_SHARED_SECRET must differ",
            ));
        }

        let backend = match vars.or("PRIVILEGE_BACKEND", "memory").as_str() {
            "memory" => BackendConfig::Memory,
            "command" => BackendConfig::Command {
                admin_group: vars.optional("ADMIN_GROUP"),
            },
            other => {
                return Err(AppError::validation(format!(
                    "PRIVILEGE_BACKEND must be either 'memory' or 'command', got '{other}'"
                )));
            }
        };

        let notifier = match vars.or("NOTIFIER", "console").as_str() {
            "console" => NotifierConfig::Console,
            "webhook" => {
                let secret = vars.required("WEBHOOK_SECRET")?;
                require_min_length("WEBHOOK_SECRET", &secret, MIN_WEBHOOK_SECRET_LENGTH)?;
                NotifierConfig::Webhook {
                    url: vars.required("WEBHOOK_URL")?,
                    secret,
                }
            }
            "smtp" => {
                let port = vars
                    .required("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::validation(format!("invalid SMTP_PORT: {error}")))?;
                NotifierConfig::Smtp(SmtpRuntimeConfig {
                    host: vars.required("SMTP_HOST")?,
                    port,
                    username: vars.required("SMTP_USERNAME")?,
                    password: vars.required("SMTP_PASSWORD")?,
                    from_address: vars.required("SMTP_FROM_ADDRESS")?,
                    approver_address: vars.required("APPROVER_EMAIL")?,
                })
            }
            other => {
                return Err(AppError::validation(format!(
                    "NOTIFIER must be one of 'console', 'webhook' or 'smtp', got '{other}'"
                )));
            }
        };

        let api_host = vars.or("API_HOST", "127.0.0.1");
        let api_port = vars.positive_u64("API_PORT", 3001)?;
        let api_port = u16::try_from(api_port)
            .map_err(|_| AppError::validation(format!("API_PORT {api_port} is out of range")))?;
        let default_base_url = format!("http://{api_host}:{api_port}");
        let public_base_url = vars.or("PUBLIC_BASE_URL", default_base_url.as_str());

        let webhook_max_attempts = vars.positive_u64("WEBHOOK_MAX_ATTEMPTS", 3)?;
        let webhook_max_attempts = u8::try_from(webhook_max_attempts).map_err(|_| {
            AppError::validation(format!(
                "WEBHOOK_MAX_ATTEMPTS {webhook_max_attempts} is out of range"
            ))
        })?;

        Ok(Self {
            store_path: PathBuf::from(vars.or("TEMPADMIN_STORE_PATH", "./data/requests.json")),
            token_signing_secret,
            approval_token_ttl_minutes: vars.positive_u64("APPROVAL_TOKEN_TTL_MINUTES", 15)?,
            token_sweep_interval_seconds: vars
                .positive_u64("TOKEN_SWEEP_INTERVAL_SECONDS", 60)?,
            expiry_warning_minutes: vars.u64_or("EXPIRY_WARNING_MINUTES", 5)?,
            revoke_retry_seconds: vars.positive_u64("REVOKE_RETRY_SECONDS", 60)?,
            store_lock_timeout_ms: vars.positive_u64("STORE_LOCK_TIMEOUT_MS", 5_000)?,
            store_read_lock_timeout_ms: vars.positive_u64("STORE_READ_LOCK_TIMEOUT_MS", 250)?,
            api_host,
            api_port,
            public_base_url,
            dashboard_url: vars.or("DASHBOARD_URL", "http://localhost:3000"),
            requester_shared_secret,
            dashboard_shared_secret,
            backend,
            notifier,
            webhook_max_attempts,
            webhook_retry_backoff_ms: vars.positive_u64("WEBHOOK_RETRY_BACKOFF_MS", 500)?,
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> AppResult<String> {
        self.optional(key)
            .ok_or_else(|| AppError::validation(format!("{key} must be set")))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_owned())
    }

    fn u64_or(&self, key: &str, default: u64) -> AppResult<u64> {
        match self.optional(key) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|error| AppError::validation(format!("invalid {key}: {error}"))),
            None => Ok(default),
        }
    }

    fn positive_u64(&self, key: &str, default: u64) -> AppResult<u64> {
        let value = self.u64_or(key, default)?;
        if value == 0 {
            return Err(AppError::validation(format!("{key} must be greater than zero")));
        }
        Ok(value)
    }
}

fn require_min_length(key: &str, value: &str, min: usize) -> AppResult<()> {
    if value.len() < min {
        return Err(AppError::validation(format!(
            "{key} must be at least {min} characters"
        )));
    }
    Ok(())
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempadmin_core::{AppError, AppResult};

    use super::{ApiConfig, BackendConfig};

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("TOKEN_SIGNING_SECRET", "s".repeat(32)),
            ("REQUESTER_SHARED_SECRET", "r".repeat(32)),
            ("DASHBOARD_SHARED_SECRET", "d".repeat(32)),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> AppResult<ApiConfig> {
        ApiConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() -> AppResult<()> {
        let config = load(&base_env())?;

        assert_eq!(config.api_port, 3001);
        assert_eq!(config.approval_token_ttl_minutes, 15);
        assert_eq!(config.expiry_warning_minutes, 5);
        assert_eq!(config.public_base_url, "http://127.0.0.1:3001");
        assert_eq!(config.backend, BackendConfig::Memory);
        assert_eq!(config.notifier.name(), "console");
        assert_eq!(config.socket_address()?.port(), 3001);
        Ok(())
    }

    #[test]
    fn short_signing_secret_is_rejected() {
        let mut env = base_env();
        env.insert("TOKEN_SIGNING_SECRET", "short".to_owned());

        assert!(matches!(load(&env), Err(AppError::Validation(_))));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut env = base_env();
        env.insert("REVOKE_RETRY_SECONDS", "0".to_owned());

        assert!(matches!(load(&env), Err(AppError::Validation(_))));
    }

    #[test]
    fn zero_warning_lead_disables_the_warning() -> AppResult<()> {
        let mut env = base_env();
        env.insert("EXPIRY_WARNING_MINUTES", "0".to_owned());

        assert_eq!(load(&env)?.expiry_warning_minutes, 0);
        Ok(())
    }

    #[test]
    fn webhook_notifier_requires_url_and_long_secret() -> AppResult<()> {
        let mut env = base_env();
        env.insert("NOTIFIER", "webhook".to_owned());
        assert!(load(&env).is_err());

        env.insert("WEBHOOK_URL", "https://hooks.example.com/tempadmin".to_owned());
        env.insert("WEBHOOK_SECRET", "w".repeat(32));
        assert_eq!(load(&env)?.notifier.name(), "webhook");
        Ok(())
    }

    #[test]
    fn unknown_provider_names_are_rejected() {
        let mut env = base_env();
        env.insert("NOTIFIER", "pager".to_owned());
        assert!(load(&env).is_err());

        let mut env = base_env();
        env.insert("PRIVILEGE_BACKEND", "ldap".to_owned());
        assert!(load(&env).is_err());
    }

    #[test]
    fn command_backend_keeps_optional_group_override() -> AppResult<()> {
        let mut env = base_env();
        env.insert("PRIVILEGE_BACKEND", "command".to_owned());
        env.insert("ADMIN_GROUP", "wheel".to_owned());

        assert_eq!(
            load(&env)?.backend,
            BackendConfig::Command {
                admin_group: Some("wheel".to_owned())
            }
        );
        Ok(())
    }

    #[test]
    fn shared_secrets_must_differ() {
        let mut env = base_env();
        env.insert("DASHBOARD_SHARED_SECRET", "r".repeat(32));

        assert!(load(&env).is_err());
    }
}
