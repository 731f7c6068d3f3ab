use async_trait::async_trait;
use tempadmin_core::AppResult;
use tempadmin_domain::{PrivilegeRequest, RequestId};

/// Whether a mutation altered the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The record changed and was written back.
    Changed,
    /// The record was left as is; no write happened.
    Unchanged,
}

/// Mutation applied to the latest stored version of one request.
///
/// Runs while the store holds its write lock, so it must not block.
pub type RequestMutation =
    Box<dyn FnOnce(&mut PrivilegeRequest) -> AppResult<MutationOutcome> + Send>;

/// Result of a read-modify-write cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRequest {
    /// Request as stored after the cycle.
    pub request: PrivilegeRequest,
    /// Whether the mutation changed it.
    pub outcome: MutationOutcome,
}

/// Repository port for privilege request persistence.
#[async_trait]
pub trait PrivilegeRequestRepository: Send + Sync {
    /// Persists a new request.
    async fn create(&self, request: PrivilegeRequest) -> AppResult<()>;

    /// Finds a request by identifier.
    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<PrivilegeRequest>>;

    /// Lists every stored request, newest first.
    async fn list_all(&self) -> AppResult<Vec<PrivilegeRequest>>;

    /// Applies `mutation` to the latest stored version of the request.
    ///
    /// Returns `NotFound` when the request does not exist. A failing
    /// mutation leaves the stored record untouched.
    async fn update(&self, id: RequestId, mutation: RequestMutation)
    -> AppResult<UpdatedRequest>;
}
