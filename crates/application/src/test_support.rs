use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempadmin_core::{AppError, AppResult, TokenError};
use tempadmin_domain::{
    AccountName, ApprovalAction, LifecycleEvent, PrivilegeRequest, PrivilegeRequestInput,
    RequestId,
};

use crate::privilege_ports::{
    ApprovalNotifier, ApprovalTokenIssuer, AuditEvent, AuditRepository, Clock, IssuedToken,
    MutationOutcome, PrivilegeBackend, PrivilegeRequestRepository, RequestMutation,
    RevocationScheduler, TokenGrant, UpdatedRequest,
};
use crate::{ExpirationService, PrivilegeLifecycleService};

fn lock<T>(mutex: &Mutex<T>) -> AppResult<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|error| AppError::Internal(format!("failed to lock fake state: {error}")))
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn input(identity: &str, minutes: u32) -> PrivilegeRequestInput {
    PrivilegeRequestInput {
        requester_identity: identity.to_owned(),
        display_name: "Alice Example".to_owned(),
        duration_minutes: minutes,
        reason: "rotate the TLS certificates".to_owned(),
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

#[derive(Default)]
pub struct FakeRequestRepository {
    requests: tokio::sync::Mutex<HashMap<RequestId, PrivilegeRequest>>,
    interleaved: Mutex<Option<PrivilegeRequest>>,
    fail_updates: Mutex<bool>,
}

impl FakeRequestRepository {
    pub async fn insert(&self, request: PrivilegeRequest) {
        self.requests.lock().await.insert(request.id(), request);
    }

    /// Stores `request` right before the next mutation runs, as if another
    /// process had written it first.
    pub fn interleave_next_update(&self, request: PrivilegeRequest) {
        if let Ok(mut slot) = self.interleaved.lock() {
            *slot = Some(request);
        }
    }

    pub fn set_fail_updates(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_updates.lock() {
            *flag = fail;
        }
    }
}

#[async_trait]
impl PrivilegeRequestRepository for FakeRequestRepository {
    async fn create(&self, request: PrivilegeRequest) -> AppResult<()> {
        self.requests.lock().await.insert(request.id(), request);
        Ok(())
    }

    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<PrivilegeRequest>> {
        Ok(self.requests.lock().await.get(&id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<PrivilegeRequest>> {
        let mut requests: Vec<_> = self.requests.lock().await.values().cloned().collect();
        requests.sort_by_key(|request| std::cmp::Reverse(request.created_at()));
        Ok(requests)
    }

    async fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
    ) -> AppResult<UpdatedRequest> {
        let mut requests = self.requests.lock().await;
        let interleaved = lock(&self.interleaved)?.take();
        if let Some(winner) = interleaved {
            requests.insert(winner.id(), winner);
        }
        let fail = *lock(&self.fail_updates)?;
        if fail {
            return Err(AppError::Store("snapshot rename failed".to_owned()));
        }
        let stored = requests
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("privilege request '{id}'")))?;
        let mut candidate = stored.clone();
        let outcome = mutation(&mut candidate)?;
        if outcome == MutationOutcome::Changed {
            requests.insert(id, candidate.clone());
        }

        Ok(UpdatedRequest {
            request: candidate,
            outcome,
        })
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub grants: Mutex<Vec<String>>,
    pub revokes: Mutex<Vec<String>>,
    pub fail_grant: Mutex<bool>,
    pub fail_revoke: Mutex<bool>,
    pub strict_membership: Mutex<bool>,
}

impl FakeBackend {
    pub fn set_fail_grant(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_grant.lock() {
            *flag = fail;
        }
    }

    pub fn set_fail_revoke(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_revoke.lock() {
            *flag = fail;
        }
    }

    /// Makes revoking a non-member fail the way `gpasswd -d` does.
    pub fn set_strict_membership(&self, strict: bool) {
        if let Ok(mut flag) = self.strict_membership.lock() {
            *flag = strict;
        }
    }

    fn membership(&self, account: &AccountName) -> AppResult<bool> {
        let granted = lock(&self.grants)?
            .iter()
            .filter(|name| name.as_str() == account.as_str())
            .count();
        let revoked = lock(&self.revokes)?
            .iter()
            .filter(|name| name.as_str() == account.as_str())
            .count();
        Ok(granted > revoked)
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().map(|grants| grants.len()).unwrap_or(0)
    }

    pub fn revoke_count(&self) -> usize {
        self.revokes.lock().map(|revokes| revokes.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PrivilegeBackend for FakeBackend {
    async fn grant(&self, account: &AccountName) -> AppResult<()> {
        if *lock(&self.fail_grant)? {
            return Err(AppError::Backend("group add exited with status 1".to_owned()));
        }
        lock(&self.grants)?.push(account.as_str().to_owned());
        Ok(())
    }

    async fn revoke(&self, account: &AccountName) -> AppResult<()> {
        if *lock(&self.fail_revoke)? {
            return Err(AppError::Backend("group remove exited with status 1".to_owned()));
        }
        let strict = *lock(&self.strict_membership)?;
        if strict && !self.membership(account)? {
            return Err(AppError::Backend(format!(
                "group remove exited with status 3: '{account}' is not a member"
            )));
        }
        lock(&self.revokes)?.push(account.as_str().to_owned());
        Ok(())
    }

    async fn is_elevated(&self, account: &AccountName) -> AppResult<bool> {
        self.membership(account)
    }
}

struct FakeTokenState {
    action: ApprovalAction,
    request_id: RequestId,
    used: bool,
}

#[derive(Default)]
pub struct FakeTokenIssuer {
    tokens: Mutex<HashMap<String, FakeTokenState>>,
    counter: Mutex<u64>,
}

impl ApprovalTokenIssuer for FakeTokenIssuer {
    fn issue(&self, request_id: RequestId, action: ApprovalAction) -> AppResult<IssuedToken> {
        let mut counter = lock(&self.counter)?;
        *counter += 1;
        let token = format!("{}-{request_id}-{}", action.as_str(), *counter);
        lock(&self.tokens)?.insert(
            token.clone(),
            FakeTokenState {
                action,
                request_id,
                used: false,
            },
        );

        Ok(IssuedToken {
            token,
            action,
            expires_at: start_time() + Duration::minutes(15),
        })
    }

    fn validate(&self, token: &str) -> AppResult<TokenGrant> {
        if token.is_empty() {
            return Err(TokenError::Missing.into());
        }
        let mut tokens = lock(&self.tokens)?;
        let state = tokens.get_mut(token).ok_or(TokenError::Unknown)?;
        if state.used {
            return Err(TokenError::AlreadyUsed.into());
        }
        state.used = true;

        Ok(TokenGrant {
            request_id: state.request_id,
            action: state.action,
        })
    }

    fn invalidate_request(&self, request_id: RequestId) -> AppResult<usize> {
        let mut invalidated = 0;
        for state in lock(&self.tokens)?.values_mut() {
            if state.request_id == request_id && !state.used {
                state.used = true;
                invalidated += 1;
            }
        }
        Ok(invalidated)
    }

    fn sweep_expired(&self) -> AppResult<usize> {
        Ok(0)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<LifecycleEvent>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(LifecycleEvent::kind).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApprovalNotifier for RecordingNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> AppResult<()> {
        if *lock(&self.fail)? {
            return Err(AppError::Internal("webhook unreachable".to_owned()));
        }
        lock(&self.events)?.push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    pub armed: Mutex<HashMap<RequestId, DateTime<Utc>>>,
    pub calls: Mutex<usize>,
}

impl RecordingScheduler {
    pub fn armed_at(&self, id: RequestId) -> Option<DateTime<Utc>> {
        self.armed
            .lock()
            .ok()
            .and_then(|armed| armed.get(&id).copied())
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().map(|armed| armed.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RevocationScheduler for RecordingScheduler {
    async fn schedule(&self, id: RequestId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        *lock(&self.calls)? += 1;
        let mut armed = lock(&self.armed)?;
        if armed.contains_key(&id) {
            return Ok(false);
        }
        armed.insert(id, expires_at);
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeAuditRepository {
    pub events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        lock(&self.events)?.push(event);
        Ok(())
    }
}

pub struct Harness {
    pub repository: Arc<FakeRequestRepository>,
    pub backend: Arc<FakeBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: Arc<RecordingScheduler>,
    pub audit: Arc<FakeAuditRepository>,
    pub clock: Arc<ManualClock>,
    pub service: PrivilegeLifecycleService,
}

impl Harness {
    pub fn new() -> Self {
        let repository = Arc::new(FakeRequestRepository::default());
        let backend = Arc::new(FakeBackend::default());
        let tokens = Arc::new(FakeTokenIssuer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let service = PrivilegeLifecycleService::new(
            repository.clone(),
            backend.clone(),
            tokens.clone(),
            notifier.clone(),
            scheduler.clone(),
            audit.clone(),
            clock.clone(),
        );

        Self {
            repository,
            backend,
            notifier,
            scheduler,
            audit,
            clock,
            service,
        }
    }

    pub fn expiration_service(&self) -> ExpirationService {
        ExpirationService::new(
            self.repository.clone(),
            self.service.clone(),
            self.scheduler.clone(),
            self.clock.clone(),
        )
    }

    /// Submits, approves and activates one request.
    pub async fn active_request(&self, identity: &str, minutes: u32) -> AppResult<RequestId> {
        let submitted = self.service.submit(input(identity, minutes)).await?;
        let id = submitted.request.id();
        self.service
            .decide(id, ApprovalAction::Approve, Some("carol"))
            .await?;
        self.service.activate(id).await?;
        Ok(id)
    }
}
