use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Approver decision submitted from the dashboard.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/decision-request.ts"
)]
pub struct DecisionRequest {
    /// `approve` or `deny`.
    pub decision: String,
}

/// Early revocation of an active grant.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/revoke-request.ts"
)]
pub struct RevokeRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/revocation-response.ts"
)]
pub struct RevocationResponse {
    pub id: String,
    pub revoked: bool,
    pub status: String,
}

/// Signed callback from the external approval channel.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/webhook-decision-request.ts"
)]
pub struct WebhookDecisionRequest {
    pub token: String,
}
