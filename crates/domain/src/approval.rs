use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempadmin_core::AppError;

use crate::RequestStatus;

/// Decision an approver can take on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Grants the request; activation becomes possible.
    Approve,
    /// Rejects the request; terminal.
    Deny,
}

impl ApprovalAction {
    /// Returns a stable transport value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Returns the status a pending request moves to under this decision.
    #[must_use]
    pub fn resulting_status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Deny => RequestStatus::Denied,
        }
    }

    /// Returns the compact byte tag used inside signed approval tokens.
    #[must_use]
    pub fn wire_tag(&self) -> u8 {
        match self {
            Self::Approve => 1,
            Self::Deny => 2,
        }
    }

    /// Parses a byte tag produced by [`ApprovalAction::wire_tag`].
    #[must_use]
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Approve),
            2 => Some(Self::Deny),
            _ => None,
        }
    }
}

impl FromStr for ApprovalAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "approve" => Ok(Self::Approve),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::validation(format!(
                "decision must be 'approve' or 'deny', got '{value}'"
            ))),
        }
    }
}
