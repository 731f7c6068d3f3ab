use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tempadmin_domain::RequestId;

use crate::dto::{
    ActivationResponse, PrivilegeRequestResponse, RequestStatusResponse, SubmitPrivilegeRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn submit_request_handler(
    State(state): State<AppState>,
    Json(payload): Json<SubmitPrivilegeRequest>,
) -> ApiResult<(StatusCode, Json<PrivilegeRequestResponse>)> {
    let submitted = state.lifecycle.submit(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(PrivilegeRequestResponse::from(&submitted.request)),
    ))
}

pub async fn request_status_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<RequestStatusResponse>> {
    let id = RequestId::parse(request_id.as_str())?;
    let view = state.lifecycle.status(id).await?;

    Ok(Json(RequestStatusResponse::from(view)))
}

pub async fn activate_request_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<ActivationResponse>> {
    let id = RequestId::parse(request_id.as_str())?;
    let activation = state.lifecycle.activate(id).await?;

    Ok(Json(ActivationResponse::new(id, activation)))
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use tempadmin_core::{AppError, AppResult};
    use tempadmin_domain::ApprovalAction;

    use super::{activate_request_handler, request_status_handler, submit_request_handler};
    use crate::dto::SubmitPrivilegeRequest;
    use crate::handlers::test_support::{TestApp, submit_payload};

    #[tokio::test]
    async fn submit_returns_created_pending_request() -> AppResult<()> {
        let app = TestApp::new()?;

        let (status, Json(body)) =
            submit_request_handler(State(app.state.clone()), Json(submit_payload("alice")))
                .await
                .map_err(|error| error.0)?;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status, "pending");
        assert_eq!(body.requester_identity, "alice");
        assert!(body.expires_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_submission_surfaces_every_violation() -> AppResult<()> {
        let app = TestApp::new()?;
        let payload = SubmitPrivilegeRequest {
            requester_identity: "root; rm -rf /".to_owned(),
            display_name: String::new(),
            duration_minutes: 45,
            reason: "because".to_owned(),
        };

        let result = submit_request_handler(State(app.state.clone()), Json(payload)).await;

        let Err(error) = result else {
            panic!("expected validation failure");
        };
        let AppError::Validation(violations) = error.0 else {
            panic!("expected validation failure");
        };
        assert_eq!(violations.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn activation_requires_approval_then_reports_elevation() -> AppResult<()> {
        let app = TestApp::new()?;
        let id = app.submit("alice").await?;

        let early = activate_request_handler(State(app.state.clone()), Path(id.to_string())).await;
        assert!(matches!(
            early.map_err(|error| error.0),
            Err(AppError::InvalidTransition(_))
        ));

        app.state
            .lifecycle
            .decide(id, ApprovalAction::Approve, Some("carol"))
            .await?;
        let Json(first) = activate_request_handler(State(app.state.clone()), Path(id.to_string()))
            .await
            .map_err(|error| error.0)?;
        let Json(second) =
            activate_request_handler(State(app.state.clone()), Path(id.to_string()))
                .await
                .map_err(|error| error.0)?;
        let Json(status) = request_status_handler(State(app.state.clone()), Path(id.to_string()))
            .await
            .map_err(|error| error.0)?;

        assert_eq!(first.outcome, "activated");
        assert_eq!(second.outcome, "already_active");
        assert_eq!(first.expires_at, second.expires_at);
        assert_eq!(status.request.status, "active");
        assert_eq!(status.is_elevated, Some(true));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_request_id_is_not_found() -> AppResult<()> {
        let app = TestApp::new()?;

        let result =
            request_status_handler(State(app.state.clone()), Path("not-a-uuid".to_owned())).await;

        assert!(matches!(
            result.map_err(|error| error.0),
            Err(AppError::NotFound(_))
        ));
        Ok(())
    }
}
