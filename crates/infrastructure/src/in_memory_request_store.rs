use std::collections::HashMap;

use async_trait::async_trait;
use tempadmin_application::{
    MutationOutcome, PrivilegeRequestRepository, RequestMutation, UpdatedRequest,
};
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{PrivilegeRequest, RequestId};
use tokio::sync::RwLock;

/// Process-local request store for development and tests.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, PrivilegeRequest>>,
}

impl InMemoryRequestStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrivilegeRequestRepository for InMemoryRequestStore {
    async fn create(&self, request: PrivilegeRequest) -> AppResult<()> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id()) {
            return Err(AppError::Store(format!(
                "privilege request '{}' already exists",
                request.id()
            )));
        }
        requests.insert(request.id(), request);
        Ok(())
    }

    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<PrivilegeRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<PrivilegeRequest>> {
        let mut requests: Vec<_> = self.requests.read().await.values().cloned().collect();
        requests.sort_by_key(|request| std::cmp::Reverse(request.created_at()));
        Ok(requests)
    }

    async fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
    ) -> AppResult<UpdatedRequest> {
        let mut requests = self.requests.write().await;
        let mut request = requests.get(&id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("privilege request '{id}' does not exist"))
        })?;

        let outcome = mutation(&mut request)?;
        if outcome == MutationOutcome::Changed {
            request.check_invariants()?;
            requests.insert(id, request.clone());
        }

        Ok(UpdatedRequest { request, outcome })
    }
}

#[cfg(test)]
mod tests {
    use tempadmin_application::{MutationOutcome, PrivilegeRequestRepository};
    use tempadmin_core::{AppError, AppResult};
    use tempadmin_domain::{ApprovalAction, PrivilegeRequest, PrivilegeRequestInput, RequestId};

    use super::InMemoryRequestStore;
    use crate::test_clock::start_time;

    #[tokio::test]
    async fn update_of_unknown_request_is_not_found() {
        let store = InMemoryRequestStore::new();

        let result = store
            .update(
                RequestId::new(),
                Box::new(|_| Ok(MutationOutcome::Unchanged)),
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() -> AppResult<()> {
        let store = InMemoryRequestStore::new();
        let request = PrivilegeRequest::submit(
            PrivilegeRequestInput {
                requester_identity: "alice".to_owned(),
                display_name: String::new(),
                duration_minutes: 15,
                reason: String::new(),
            },
            start_time(),
        )?;
        store.create(request.clone()).await?;

        assert!(store.create(request.clone()).await.is_err());

        let updated = store
            .update(
                request.id(),
                Box::new(|request| {
                    request.decide(ApprovalAction::Deny, None, start_time())?;
                    Ok(MutationOutcome::Changed)
                }),
            )
            .await?;
        assert_eq!(updated.outcome, MutationOutcome::Changed);
        Ok(())
    }
}
