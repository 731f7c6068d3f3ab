use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{PrivilegeRequest, PrivilegeRequestParts, RequestId, RequestStatus};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk document: `{ "version": 1, "requests": { "<id>": { … } } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    #[serde(default)]
    pub requests: BTreeMap<String, StoredRequest>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            requests: BTreeMap::new(),
        }
    }
}

impl StoreSnapshot {
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let snapshot: Self = serde_json::from_slice(bytes)
            .map_err(|error| {
                AppError::Store(format!("failed to parse request snapshot: {error}"))
            })?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(AppError::Store(format!(
                "request snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }

        Ok(snapshot)
    }

    pub fn to_json(&self) -> AppResult<Vec<u8>> {
        let document = Self {
            version: SNAPSHOT_VERSION,
            requests: self.requests.clone(),
        };
        serde_json::to_vec_pretty(&document)
            .map_err(|error| AppError::Store(format!("failed to encode request snapshot: {error}")))
    }
}

/// Persisted request record. Unknown fields are ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRequest {
    pub id: RequestId,
    pub requester_identity: String,
    #[serde(default)]
    pub display_name: String,
    pub requested_duration_minutes: u32,
    #[serde(default)]
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub decided_by: Option<String>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revocation_reason: Option<String>,
}

impl StoredRequest {
    pub fn into_request(self) -> AppResult<PrivilegeRequest> {
        let id = self.id;
        PrivilegeRequest::restore(PrivilegeRequestParts {
            id: self.id,
            requester_identity: self.requester_identity,
            display_name: self.display_name,
            duration_minutes: self.requested_duration_minutes,
            reason: self.reason,
            status: self.status,
            created_at: self.created_at,
            decided_at: self.decided_at,
            decided_by: self.decided_by,
            activated_at: self.activated_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            revocation_reason: self.revocation_reason,
        })
        .map_err(|error| AppError::Store(format!("stored request '{id}' is corrupt: {error}")))
    }
}

impl From<&PrivilegeRequest> for StoredRequest {
    fn from(request: &PrivilegeRequest) -> Self {
        let parts = request.to_parts();
        Self {
            id: parts.id,
            requester_identity: parts.requester_identity,
            display_name: parts.display_name,
            requested_duration_minutes: parts.duration_minutes,
            reason: parts.reason,
            status: parts.status,
            created_at: parts.created_at,
            decided_at: parts.decided_at,
            decided_by: parts.decided_by,
            activated_at: parts.activated_at,
            expires_at: parts.expires_at,
            revoked_at: parts.revoked_at,
            revocation_reason: parts.revocation_reason,
        }
    }
}
