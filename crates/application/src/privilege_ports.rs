mod audit;
mod backend;
mod clock;
mod notifier;
mod repository;
mod scheduler;
mod token;

pub use audit::{AuditEvent, AuditRepository};
pub use backend::PrivilegeBackend;
pub use clock::{Clock, SystemClock};
pub use notifier::ApprovalNotifier;
pub use repository::{MutationOutcome, PrivilegeRequestRepository, RequestMutation, UpdatedRequest};
pub use scheduler::{ExpiryHandler, ExpiryOutcome, RevocationScheduler};
pub use token::{ApprovalTokenIssuer, IssuedToken, TokenGrant};
