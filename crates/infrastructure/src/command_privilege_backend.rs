//! Privilege backend that edits the local administrator group.
//!
//! Commands are spawned directly with an argument vector, never through a
//! shell, and the account name is re-checked against the allow-list right
//! before every spawn. Removing an account that is already outside the group
//! counts as success, so a revoke can be replayed after a crash.

use std::sync::Arc;

use async_trait::async_trait;
use tempadmin_application::PrivilegeBackend;
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{AccountName, is_allowed_account_name};
use tokio::process::Command;
use tracing::{debug, warn};

/// Operating system flavour that decides which group tool is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// `gpasswd` based group management.
    Linux,
    /// `dseditgroup` based group management.
    MacOs,
}

impl HostPlatform {
    /// Detects the platform this binary was built for.
    pub fn current() -> AppResult<Self> {
        if cfg!(target_os = "linux") {
            Ok(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Self::MacOs)
        } else {
            Err(AppError::validation(format!(
                "command privilege backend is not supported on '{}'",
                std::env::consts::OS
            )))
        }
    }

    /// Returns the administrator group used when none is configured.
    #[must_use]
    pub fn default_admin_group(&self) -> &'static str {
        match self {
            Self::Linux => "sudo",
            Self::MacOs => "admin",
        }
    }
}

/// One program invocation with its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run.
    pub program: &'static str,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

/// Executes one invocation and returns its standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the program; a non-zero exit is reported as [`AppError::Backend`].
    async fn run(&self, invocation: &Invocation) -> AppResult<String>;
}

/// Runner that spawns real processes through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> AppResult<String> {
        debug!(program = invocation.program, args = ?invocation.args, "running privilege command");
        let output = Command::new(invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                AppError::Backend(format!("failed to spawn {}: {error}", invocation.program))
            })?;

        if !output.status.success() {
            return Err(AppError::Backend(format!(
                "{} exited with {}: {}",
                invocation.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Grants and revokes administrator rights through group membership.
#[derive(Clone)]
pub struct CommandPrivilegeBackend {
    platform: HostPlatform,
    admin_group: String,
    runner: Arc<dyn CommandRunner>,
}

impl CommandPrivilegeBackend {
    /// Creates a backend editing `admin_group` on `platform`.
    pub fn new(platform: HostPlatform, admin_group: impl Into<String>) -> AppResult<Self> {
        let admin_group = admin_group.into();
        if !is_allowed_account_name(admin_group.as_str()) {
            return Err(AppError::validation(format!(
                "admin group '{admin_group}' is not a valid group name"
            )));
        }

        Ok(Self {
            platform,
            admin_group,
            runner: Arc::new(ProcessRunner),
        })
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Builds the invocation that adds the account to the admin group.
    #[must_use]
    pub fn grant_invocation(&self, account: &AccountName) -> Invocation {
        self.membership_invocation(account, true)
    }

    /// Builds the invocation that removes the account from the admin group.
    #[must_use]
    pub fn revoke_invocation(&self, account: &AccountName) -> Invocation {
        self.membership_invocation(account, false)
    }

    fn membership_invocation(&self, account: &AccountName, add: bool) -> Invocation {
        let account = account.as_str().to_owned();
        let group = self.admin_group.clone();
        match self.platform {
            HostPlatform::Linux => Invocation {
                program: "gpasswd",
                args: vec![if add { "-a" } else { "-d" }.to_owned(), account, group],
            },
            HostPlatform::MacOs => Invocation {
                program: "dseditgroup",
                args: vec![
                    "-o".to_owned(),
                    "edit".to_owned(),
                    if add { "-a" } else { "-d" }.to_owned(),
                    account,
                    "-t".to_owned(),
                    "user".to_owned(),
                    group,
                ],
            },
        }
    }

    async fn run(&self, account: &AccountName, invocation: Invocation) -> AppResult<String> {
        if !is_allowed_account_name(account.as_str()) {
            return Err(AppError::Backend(
                "account name failed allow-list check".to_owned(),
            ));
        }

        self.runner.run(&invocation).await
    }
}

#[async_trait]
impl PrivilegeBackend for CommandPrivilegeBackend {
    async fn grant(&self, account: &AccountName) -> AppResult<()> {
        self.run(account, self.grant_invocation(account)).await?;
        Ok(())
    }

    async fn revoke(&self, account: &AccountName) -> AppResult<()> {
        let Err(error) = self.run(account, self.revoke_invocation(account)).await else {
            return Ok(());
        };

        // gpasswd and dseditgroup both fail when the account is not a member.
        match self.is_elevated(account).await {
            Ok(false) => {
                warn!(
                    account = %account,
                    error = %error,
                    "group removal failed but account is not a member"
                );
                Ok(())
            }
            _ => Err(error),
        }
    }

    async fn is_elevated(&self, account: &AccountName) -> AppResult<bool> {
        let groups = self
            .run(
                account,
                Invocation {
                    program: "id",
                    args: vec!["-Gn".to_owned(), account.as_str().to_owned()],
                },
            )
            .await?;

        Ok(groups
            .split_whitespace()
            .any(|group| group == self.admin_group))
    }
}
