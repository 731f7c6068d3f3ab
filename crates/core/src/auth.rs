use serde::{Deserialize, Serialize};

/// Approver resolved by the dashboard's own login before a decision reaches the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverIdentity {
    subject: String,
    display_name: String,
}

impl ApproverIdentity {
    /// Creates an approver identity from authentication data.
    #[must_use]
    pub fn new(subject: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
        }
    }

    /// Returns the stable subject of the approver.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the approver.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}
