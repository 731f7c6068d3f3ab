mod dashboard;
mod health;
mod requests;

pub use dashboard::{DecisionRequest, RevocationResponse, RevokeRequest, WebhookDecisionRequest};
pub use health::HealthResponse;
pub use requests::{
    ActivationResponse, PrivilegeRequestResponse, RequestStatusResponse, SubmitPrivilegeRequest,
};

#[cfg(test)]
mod tests {
    use super::{
        ActivationResponse, DecisionRequest, HealthResponse, PrivilegeRequestResponse,
        RequestStatusResponse, RevocationResponse, RevokeRequest, SubmitPrivilegeRequest,
        WebhookDecisionRequest,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        SubmitPrivilegeRequest::export(&config)?;
        PrivilegeRequestResponse::export(&config)?;
        RequestStatusResponse::export(&config)?;
        ActivationResponse::export(&config)?;
        DecisionRequest::export(&config)?;
        RevokeRequest::export(&config)?;
        RevocationResponse::export(&config)?;
        WebhookDecisionRequest::export(&config)?;
        ErrorResponse::export(&config)?;
        HealthResponse::export(&config)?;

        Ok(())
    }
}
