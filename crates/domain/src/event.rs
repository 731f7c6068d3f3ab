use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApprovalAction, PrivilegeRequest, RequestId};

/// Lifecycle notifications published to approval channels.
///
/// Serialized with a `type` tag and camelCase fields, e.g.
/// `{"type":"request_activated","id":"…","expiresAt":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    /// A request was submitted and awaits a decision.
    NewRequest {
        /// Request identifier.
        id: RequestId,
        /// Account to elevate.
        requester_identity: String,
        /// Requester display name.
        display_name: String,
        /// Requested grant length.
        duration_minutes: u32,
        /// Justification.
        reason: String,
        /// Submission timestamp.
        created_at: DateTime<Utc>,
        /// Single-use approve token.
        approve_token: String,
        /// Single-use deny token.
        deny_token: String,
    },
    /// An approver approved or denied a request.
    RequestDecided {
        /// Request identifier.
        id: RequestId,
        /// Decision taken.
        decision: ApprovalAction,
        /// Approver subject when the channel knew one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approver_identity: Option<String>,
        /// Decision timestamp.
        decided_at: DateTime<Utc>,
    },
    /// Privileges were granted.
    RequestActivated {
        /// Request identifier.
        id: RequestId,
        /// Revocation deadline.
        expires_at: DateTime<Utc>,
    },
    /// Privileges were revoked.
    RequestExpired {
        /// Request identifier.
        id: RequestId,
    },
    /// Advisory notice ahead of an upcoming revocation.
    ExpiryWarning {
        /// Request identifier.
        id: RequestId,
        /// Revocation deadline.
        expires_at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    /// Builds a `new_request` event for a freshly submitted request.
    #[must_use]
    pub fn new_request(
        request: &PrivilegeRequest,
        approve_token: impl Into<String>,
        deny_token: impl Into<String>,
    ) -> Self {
        Self::NewRequest {
            id: request.id(),
            requester_identity: request.requester_identity().as_str().to_owned(),
            display_name: request.display_name().to_owned(),
            duration_minutes: request.duration().minutes(),
            reason: request.reason().to_owned(),
            created_at: request.created_at(),
            approve_token: approve_token.into(),
            deny_token: deny_token.into(),
        }
    }

    /// Returns the request this event refers to.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::NewRequest { id, .. }
            | Self::RequestDecided { id, .. }
            | Self::RequestActivated { id, .. }
            | Self::RequestExpired { id }
            | Self::ExpiryWarning { id, .. } => *id,
        }
    }

    /// Returns the wire tag of this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewRequest { .. } => "new_request",
            Self::RequestDecided { .. } => "request_decided",
            Self::RequestActivated { .. } => "request_activated",
            Self::RequestExpired { .. } => "request_expired",
            Self::ExpiryWarning { .. } => "expiry_warning",
        }
    }
}
