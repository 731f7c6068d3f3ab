use std::collections::HashSet;

use async_trait::async_trait;
use tempadmin_application::PrivilegeBackend;
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{AccountName, is_allowed_account_name};
use tokio::sync::RwLock;
use tracing::info;

/// Privilege backend that only tracks elevated accounts in memory.
#[derive(Default)]
pub struct InMemoryPrivilegeBackend {
    elevated: RwLock<HashSet<String>>,
}

impl InMemoryPrivilegeBackend {
    /// Creates a backend with no elevated accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn checked(account: &AccountName) -> AppResult<&str> {
    if is_allowed_account_name(account.as_str()) {
        Ok(account.as_str())
    } else {
        Err(AppError::Backend(
            "account name failed allow-list check".to_owned(),
        ))
    }
}

#[async_trait]
impl PrivilegeBackend for InMemoryPrivilegeBackend {
    async fn grant(&self, account: &AccountName) -> AppResult<()> {
        let name = checked(account)?;
        self.elevated.write().await.insert(name.to_owned());
        info!(account = name, "in-memory backend granted administrator rights");
        Ok(())
    }

    async fn revoke(&self, account: &AccountName) -> AppResult<()> {
        let name = checked(account)?;
        self.elevated.write().await.remove(name);
        info!(account = name, "in-memory backend revoked administrator rights");
        Ok(())
    }

    async fn is_elevated(&self, account: &AccountName) -> AppResult<bool> {
        let name = checked(account)?;
        Ok(self.elevated.read().await.contains(name))
    }
}
