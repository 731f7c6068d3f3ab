//! Tokio timers that revoke grants at their persisted deadline.
//!
//! Each armed request gets one task. The task sleeps in bounded slices and
//! re-reads the wall clock after every wake, so suspend/resume or clock
//! adjustments never let a grant outlive its deadline by more than one slice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tempadmin_application::{Clock, ExpiryHandler, ExpiryOutcome, RevocationScheduler};
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::RequestId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Longest single sleep before the wall clock is consulted again.
const MAX_SLEEP_SLICE: StdDuration = StdDuration::from_secs(60);

/// Timing knobs for the revocation scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// How long before the deadline the advisory warning fires. Zero disables it.
    pub warning_lead: Duration,
    /// Delay between attempts when a revocation fails.
    pub retry_interval: StdDuration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            warning_lead: Duration::minutes(5),
            retry_interval: StdDuration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmCommand {
    id: RequestId,
    expires_at: DateTime<Utc>,
}

type ArmedSet = Arc<Mutex<HashSet<RequestId>>>;

fn armed_guard(armed: &ArmedSet) -> AppResult<MutexGuard<'_, HashSet<RequestId>>> {
    armed
        .lock()
        .map_err(|error| AppError::Internal(format!("scheduler state lock poisoned: {error}")))
}

/// Scheduling handle given to the lifecycle service.
#[derive(Clone)]
pub struct TokioRevocationScheduler {
    commands: mpsc::UnboundedSender<ArmCommand>,
    armed: ArmedSet,
}

/// Receiving half that owns the timer tasks once started.
pub struct RevocationSchedulerDriver {
    commands: mpsc::UnboundedReceiver<ArmCommand>,
    armed: ArmedSet,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
}

impl TokioRevocationScheduler {
    /// Creates the scheduling handle and its driver.
    ///
    /// Arms requested before [`RevocationSchedulerDriver::start`] are queued.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> (Self, RevocationSchedulerDriver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let armed: ArmedSet = Arc::new(Mutex::new(HashSet::new()));

        (
            Self {
                commands: sender,
                armed: Arc::clone(&armed),
            },
            RevocationSchedulerDriver {
                commands: receiver,
                armed,
                clock,
                settings,
            },
        )
    }

    /// Returns how many timers are currently armed.
    pub fn armed_count(&self) -> AppResult<usize> {
        Ok(armed_guard(&self.armed)?.len())
    }
}

#[async_trait]
impl RevocationScheduler for TokioRevocationScheduler {
    async fn schedule(&self, id: RequestId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        if !armed_guard(&self.armed)?.insert(id) {
            debug!(request_id = %id, "revocation timer already armed");
            return Ok(false);
        }

        if self.commands.send(ArmCommand { id, expires_at }).is_err() {
            armed_guard(&self.armed)?.remove(&id);
            return Err(AppError::Internal(
                "revocation scheduler is not running".to_owned(),
            ));
        }

        Ok(true)
    }
}

impl RevocationSchedulerDriver {
    /// Starts dispatching armed timers to `handler`.
    pub fn start(self, handler: Arc<dyn ExpiryHandler>) -> JoinHandle<()> {
        let Self {
            mut commands,
            armed,
            clock,
            settings,
        } = self;

        tokio::spawn(async move {
            info!("revocation scheduler started");
            while let Some(command) = commands.recv().await {
                let timer = RevocationTimer {
                    id: command.id,
                    expires_at: command.expires_at,
                    handler: Arc::clone(&handler),
                    clock: Arc::clone(&clock),
                    settings,
                    armed: Arc::clone(&armed),
                };
                tokio::spawn(timer.run());
            }
            info!("revocation scheduler stopped");
        })
    }
}

struct RevocationTimer {
    id: RequestId,
    expires_at: DateTime<Utc>,
    handler: Arc<dyn ExpiryHandler>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    armed: ArmedSet,
}

impl RevocationTimer {
    async fn run(self) {
        let id = self.id;
        let mut deadline = self.expires_at;
        debug!(request_id = %id, expires_at = %deadline, "revocation timer armed");

        if self.settings.warning_lead > Duration::zero() {
            let warn_at = deadline - self.settings.warning_lead;
            if self.clock.now() < warn_at {
                self.sleep_until(warn_at).await;
                if let Err(error) = self.handler.on_expiry_warning(id, deadline).await {
                    warn!(request_id = %id, error = %error, "expiry warning failed");
                }
            }
        }

        loop {
            self.sleep_until(deadline).await;

            match self.handler.on_expiry(id).await {
                Ok(ExpiryOutcome::Revoked) => {
                    info!(request_id = %id, "grant revoked at deadline");
                    break;
                }
                Ok(ExpiryOutcome::AlreadyInactive) => {
                    debug!(request_id = %id, "timer fired for inactive request");
                    break;
                }
                Ok(ExpiryOutcome::NotDue { expires_at }) => {
                    debug!(
                        request_id = %id,
                        expires_at = %expires_at,
                        "woke early, sleeping again"
                    );
                    deadline = expires_at;
                }
                Err(revoke_error) => {
                    error!(
                        request_id = %id,
                        error = %revoke_error,
                        retry_in_secs = self.settings.retry_interval.as_secs(),
                        security = true,
                        "revocation failed, account may still be elevated"
                    );
                    tokio::time::sleep(self.settings.retry_interval).await;
                }
            }
        }

        if let Ok(mut armed) = armed_guard(&self.armed) {
            armed.remove(&id);
        }
    }

    async fn sleep_until(&self, target: DateTime<Utc>) {
        loop {
            let now = self.clock.now();
            if now >= target {
                return;
            }
            let remaining = (target - now).to_std().unwrap_or(StdDuration::ZERO);
            tokio::time::sleep(remaining.min(MAX_SLEEP_SLICE)).await;
        }
    }
}
