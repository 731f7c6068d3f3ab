use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempadmin_application::RequestStatusView;
use tempadmin_domain::{Activation, PrivilegeRequest, PrivilegeRequestInput, RequestId};
use ts_rs::TS;

/// Incoming payload for a new privilege request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/submit-privilege-request.ts"
)]
pub struct SubmitPrivilegeRequest {
    pub requester_identity: String,
    pub display_name: String,
    pub duration_minutes: u32,
    pub reason: String,
}

impl From<SubmitPrivilegeRequest> for PrivilegeRequestInput {
    fn from(value: SubmitPrivilegeRequest) -> Self {
        Self {
            requester_identity: value.requester_identity,
            display_name: value.display_name,
            duration_minutes: value.duration_minutes,
            reason: value.reason,
        }
    }
}

/// API representation of a privilege request.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/privilege-request-response.ts"
)]
pub struct PrivilegeRequestResponse {
    pub id: String,
    pub requester_identity: String,
    pub display_name: String,
    pub duration_minutes: u32,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
    pub activated_at: Option<String>,
    pub expires_at: Option<String>,
    pub revoked_at: Option<String>,
    pub revocation_reason: Option<String>,
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|value| value.to_rfc3339())
}

impl From<&PrivilegeRequest> for PrivilegeRequestResponse {
    fn from(value: &PrivilegeRequest) -> Self {
        Self {
            id: value.id().to_string(),
            requester_identity: value.requester_identity().as_str().to_owned(),
            display_name: value.display_name().to_owned(),
            duration_minutes: value.duration().minutes(),
            reason: value.reason().to_owned(),
            status: value.status().as_str().to_owned(),
            created_at: value.created_at().to_rfc3339(),
            decided_at: timestamp(value.decided_at()),
            decided_by: value.decided_by().map(ToOwned::to_owned),
            activated_at: timestamp(value.activated_at()),
            expires_at: timestamp(value.expires_at()),
            revoked_at: timestamp(value.revoked_at()),
            revocation_reason: value.revocation_reason().map(ToOwned::to_owned),
        }
    }
}

/// Request record plus the backend's view of the account.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/request-status-response.ts"
)]
pub struct RequestStatusResponse {
    pub request: PrivilegeRequestResponse,
    /// `None` when the backend could not be queried.
    pub is_elevated: Option<bool>,
}

impl From<RequestStatusView> for RequestStatusResponse {
    fn from(value: RequestStatusView) -> Self {
        Self {
            request: PrivilegeRequestResponse::from(&value.request),
            is_elevated: value.is_elevated,
        }
    }
}

/// Outcome of an activation call.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activation-response.ts"
)]
pub struct ActivationResponse {
    pub id: String,
    /// `activated` or `already_active`.
    pub outcome: &'static str,
    pub expires_at: String,
}

impl ActivationResponse {
    pub fn new(id: RequestId, activation: Activation) -> Self {
        let outcome = match activation {
            Activation::Activated { .. } => "activated",
            Activation::AlreadyActive { .. } => "already_active",
        };

        Self {
            id: id.to_string(),
            outcome,
            expires_at: activation.expires_at().to_rfc3339(),
        }
    }
}
