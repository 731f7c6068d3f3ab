//! Account names handed to the privilege backend.
//!
//! The allow-list is deliberately narrow: ASCII letters, digits, `-` and `_`.
//! Anything else is rejected before it can reach a command line.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tempadmin_core::{AppError, AppResult};

/// Maximum account name length accepted for elevation.
pub const ACCOUNT_NAME_MAX_LENGTH: usize = 64;

/// Validated operating system account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    /// Creates a validated account name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let violations = account_name_violations(value.as_str());
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        Ok(Self(value))
    }

    /// Returns the validated account name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AccountName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<AccountName> for String {
    fn from(value: AccountName) -> Self {
        value.0
    }
}

/// Returns true when every character is inside the account allow-list.
///
/// Backends call this again right before spawning a command.
#[must_use]
pub fn is_allowed_account_name(value: &str) -> bool {
    account_name_violations(value).is_empty()
}

/// Lists every rule the candidate account name breaks.
#[must_use]
pub fn account_name_violations(value: &str) -> Vec<String> {
    let mut violations = Vec::new();

    if value.is_empty() {
        violations.push("requester identity must not be empty".to_owned());
        return violations;
    }

    if value.len() > ACCOUNT_NAME_MAX_LENGTH {
        violations.push(format!(
            "requester identity must not exceed {ACCOUNT_NAME_MAX_LENGTH} characters"
        ));
    }

    if !value
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || matches!(character, '-' | '_'))
    {
        violations.push(
            "requester identity may only contain letters, digits, '-' and '_'".to_owned(),
        );
    }

    if value.starts_with('-') {
        violations.push("requester identity must not start with '-'".to_owned());
    }

    violations
}
