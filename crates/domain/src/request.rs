//! Privilege request entity and its lifecycle transitions.
//!
//! `pending -> approved -> active -> expired` is the happy path and
//! `pending -> denied` is terminal. Expiration only ever leaves `active`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tempadmin_core::{AppError, AppResult};
use uuid::Uuid;

use crate::account::account_name_violations;
use crate::{AccountName, ApprovalAction};

/// Maximum display name length in characters.
pub const DISPLAY_NAME_MAX_LENGTH: usize = 100;

/// Maximum reason length in characters.
pub const REASON_MAX_LENGTH: usize = 1000;

/// Grant durations a requester may pick, in minutes.
pub const ALLOWED_GRANT_DURATIONS_MINUTES: &[u32] = &[15, 30, 60, 120, 240];

/// Unique identifier for a privilege request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value into a request identifier.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| AppError::NotFound(format!("privilege request '{value}'")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle state of a privilege request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for an approver.
    Pending,
    /// Approved, not yet activated by the requester.
    Approved,
    /// Rejected by an approver.
    Denied,
    /// Privileges are granted until `expires_at`.
    Active,
    /// Privileges were revoked.
    Expired,
}

impl RequestStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }

    /// Returns true when no further transition can leave this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Expired)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::validation(format!(
                "unknown request status '{value}'"
            ))),
        }
    }
}

/// Grant duration drawn from [`ALLOWED_GRANT_DURATIONS_MINUTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantDuration(u32);

impl GrantDuration {
    /// Creates a grant duration from the allow-list.
    pub fn from_minutes(minutes: u32) -> AppResult<Self> {
        duration_violation(minutes).map_or(Ok(Self(minutes)), |violation| {
            Err(AppError::validation(violation))
        })
    }

    /// Returns the duration in minutes.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// Returns the duration as a chrono span.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

fn duration_violation(minutes: u32) -> Option<String> {
    if ALLOWED_GRANT_DURATIONS_MINUTES.contains(&minutes) {
        return None;
    }

    let allowed = ALLOWED_GRANT_DURATIONS_MINUTES
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "duration must be one of [{allowed}] minutes, got {minutes}"
    ))
}

/// Raw submission payload before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRequestInput {
    /// Account to elevate.
    pub requester_identity: String,
    /// Human readable requester name.
    pub display_name: String,
    /// Requested grant length in minutes.
    pub duration_minutes: u32,
    /// Justification shown to approvers.
    pub reason: String,
}

/// Every persisted field of a request, used to rebuild it from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRequestParts {
    /// Request identifier.
    pub id: RequestId,
    /// Account to elevate.
    pub requester_identity: String,
    /// Human readable requester name.
    pub display_name: String,
    /// Requested grant length in minutes.
    pub duration_minutes: u32,
    /// Justification shown to approvers.
    pub reason: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Approver subject, when the channel knew one.
    pub decided_by: Option<String>,
    /// Activation timestamp.
    pub activated_at: Option<DateTime<Utc>>,
    /// Authoritative revocation deadline.
    pub expires_at: Option<DateTime<Utc>>,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the grant was revoked.
    pub revocation_reason: Option<String>,
}

/// Result of an activation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The request moved from `approved` to `active`.
    Activated {
        /// Revocation deadline.
        expires_at: DateTime<Utc>,
    },
    /// The request was already `active`; nothing changed.
    AlreadyActive {
        /// Existing revocation deadline.
        expires_at: DateTime<Utc>,
    },
}

impl Activation {
    /// Returns the revocation deadline in either case.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Self::Activated { expires_at } | Self::AlreadyActive { expires_at } => *expires_at,
        }
    }
}

/// A request for time-boxed administrator privileges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRequest {
    id: RequestId,
    requester_identity: AccountName,
    display_name: String,
    duration: GrantDuration,
    reason: String,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<String>,
    activated_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    revocation_reason: Option<String>,
}

impl PrivilegeRequest {
    /// Validates a submission and creates a `pending` request.
    ///
    /// Every violated constraint is reported, not only the first.
    pub fn submit(input: PrivilegeRequestInput, now: DateTime<Utc>) -> AppResult<Self> {
        let mut violations = account_name_violations(input.requester_identity.as_str());

        if input.display_name.chars().count() > DISPLAY_NAME_MAX_LENGTH {
            violations.push(format!(
                "display name must not exceed {DISPLAY_NAME_MAX_LENGTH} characters"
            ));
        }

        if input.reason.chars().count() > REASON_MAX_LENGTH {
            violations.push(format!(
                "reason must not exceed {REASON_MAX_LENGTH} characters"
            ));
        }

        if let Some(violation) = duration_violation(input.duration_minutes) {
            violations.push(violation);
        }

        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        Ok(Self {
            id: RequestId::new(),
            requester_identity: AccountName::new(input.requester_identity)?,
            display_name: input.display_name,
            duration: GrantDuration::from_minutes(input.duration_minutes)?,
            reason: input.reason,
            status: RequestStatus::Pending,
            created_at: now,
            decided_at: None,
            decided_by: None,
            activated_at: None,
            expires_at: None,
            revoked_at: None,
            revocation_reason: None,
        })
    }

    /// Rebuilds a request from persisted parts, checking every invariant.
    pub fn restore(parts: PrivilegeRequestParts) -> AppResult<Self> {
        let request = Self {
            id: parts.id,
            requester_identity: AccountName::new(parts.requester_identity)?,
            display_name: parts.display_name,
            duration: GrantDuration::from_minutes(parts.duration_minutes)?,
            reason: parts.reason,
            status: parts.status,
            created_at: parts.created_at,
            decided_at: parts.decided_at,
            decided_by: parts.decided_by,
            activated_at: parts.activated_at,
            expires_at: parts.expires_at,
            revoked_at: parts.revoked_at,
            revocation_reason: parts.revocation_reason,
        };
        request.check_invariants()?;

        Ok(request)
    }

    /// Applies an approver decision. Only valid while `pending`.
    pub fn decide(
        &mut self,
        decision: ApprovalAction,
        approver: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "request '{}' cannot be {} from status '{}'",
                self.id,
                past_tense(decision),
                self.status
            )));
        }

        self.status = decision.resulting_status();
        self.decided_at = Some(now);
        self.decided_by = approver.map(ToOwned::to_owned);
        Ok(())
    }

    /// Moves an `approved` request to `active`.
    ///
    /// Calling this on an `active` request returns the stored deadline and
    /// changes nothing.
    pub fn activate(&mut self, now: DateTime<Utc>) -> AppResult<Activation> {
        match self.status {
            RequestStatus::Approved => {
                let expires_at = now + self.duration.as_duration();
                self.status = RequestStatus::Active;
                self.activated_at = Some(now);
                self.expires_at = Some(expires_at);
                Ok(Activation::Activated { expires_at })
            }
            RequestStatus::Active => {
                let expires_at = self.expires_at.ok_or_else(|| {
                    AppError::Internal(format!(
                        "active request '{}' has no expiry deadline",
                        self.id
                    ))
                })?;
                Ok(Activation::AlreadyActive { expires_at })
            }
            status => Err(AppError::InvalidTransition(format!(
                "request '{}' cannot be activated from status '{status}'",
                self.id
            ))),
        }
    }

    /// Marks an `active` request as `expired` after the backend revoked it.
    pub fn expire(&mut self, reason: &str, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != RequestStatus::Active {
            return Err(AppError::InvalidTransition(format!(
                "request '{}' cannot expire from status '{}'",
                self.id, self.status
            )));
        }

        self.status = RequestStatus::Expired;
        self.revoked_at = Some(now);
        self.revocation_reason = Some(reason.to_owned());
        Ok(())
    }

    /// Verifies that optional timestamps agree with the status.
    pub fn check_invariants(&self) -> AppResult<()> {
        let mut violations = Vec::new();
        let decided = !matches!(self.status, RequestStatus::Pending);
        let granted = matches!(self.status, RequestStatus::Active | RequestStatus::Expired);

        if self.decided_at.is_some() != decided {
            violations.push(format!(
                "decided_at presence does not match status '{}'",
                self.status
            ));
        }
        if self.expires_at.is_some() != granted {
            violations.push(format!(
                "expires_at presence does not match status '{}'",
                self.status
            ));
        }
        if self.activated_at.is_some() != granted {
            violations.push(format!(
                "activated_at presence does not match status '{}'",
                self.status
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "request '{}' violates lifecycle invariants: {}",
                self.id,
                violations.join("; ")
            )))
        }
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the account to elevate.
    #[must_use]
    pub fn requester_identity(&self) -> &AccountName {
        &self.requester_identity
    }

    /// Returns the requester display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the requested grant duration.
    #[must_use]
    pub fn duration(&self) -> GrantDuration {
        self.duration
    }

    /// Returns the justification.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the decision timestamp.
    #[must_use]
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Returns the approver subject recorded with the decision.
    #[must_use]
    pub fn decided_by(&self) -> Option<&str> {
        self.decided_by.as_deref()
    }

    /// Returns the activation timestamp.
    #[must_use]
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    /// Returns the revocation deadline.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the revocation timestamp.
    #[must_use]
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Returns why the grant was revoked.
    #[must_use]
    pub fn revocation_reason(&self) -> Option<&str> {
        self.revocation_reason.as_deref()
    }

    /// Decomposes the request into its persisted parts.
    #[must_use]
    pub fn to_parts(&self) -> PrivilegeRequestParts {
        PrivilegeRequestParts {
            id: self.id,
            requester_identity: self.requester_identity.as_str().to_owned(),
            display_name: self.display_name.clone(),
            duration_minutes: self.duration.minutes(),
            reason: self.reason.clone(),
            status: self.status,
            created_at: self.created_at,
            decided_at: self.decided_at,
            decided_by: self.decided_by.clone(),
            activated_at: self.activated_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            revocation_reason: self.revocation_reason.clone(),
        }
    }
}

fn past_tense(decision: ApprovalAction) -> &'static str {
    match decision {
        ApprovalAction::Approve => "approved",
        ApprovalAction::Deny => "denied",
    }
}
