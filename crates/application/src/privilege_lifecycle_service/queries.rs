use super::*;

impl PrivilegeLifecycleService {
    /// Finds one request.
    pub async fn find(&self, id: RequestId) -> AppResult<PrivilegeRequest> {
        self.require_request(id).await
    }

    /// Lists every request, newest first.
    pub async fn list(&self) -> AppResult<Vec<PrivilegeRequest>> {
        self.repository.list_all().await
    }

    /// Returns a request with the backend's live elevation state.
    pub async fn status(&self, id: RequestId) -> AppResult<RequestStatusView> {
        let request = self.require_request(id).await?;
        let is_elevated = match self.backend.is_elevated(request.requester_identity()).await {
            Ok(is_elevated) => Some(is_elevated),
            Err(error) => {
                warn!(request_id = %id, error = %error, "elevation check failed");
                None
            }
        };

        Ok(RequestStatusView {
            request,
            is_elevated,
        })
    }
}
