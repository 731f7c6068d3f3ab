use async_trait::async_trait;
use tempadmin_core::AppResult;
use tempadmin_domain::AccountName;

/// Port for the operating system capability that grants administrator rights.
///
/// Implementations must re-check the account allow-list before acting and
/// report failures as [`tempadmin_core::AppError::Backend`].
#[async_trait]
pub trait PrivilegeBackend: Send + Sync {
    /// Grants administrator rights to the account.
    async fn grant(&self, account: &AccountName) -> AppResult<()>;

    /// Removes administrator rights from the account.
    async fn revoke(&self, account: &AccountName) -> AppResult<()>;

    /// Reports whether the account currently holds administrator rights.
    async fn is_elevated(&self, account: &AccountName) -> AppResult<bool>;
}
