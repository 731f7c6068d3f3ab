use std::convert::Infallible;
use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde_json::Value;
use tempadmin_application::Revocation;
use tempadmin_core::{AppError, ApproverIdentity};
use tempadmin_domain::{ApprovalAction, LifecycleEvent, RequestId};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::dto::{DecisionRequest, PrivilegeRequestResponse, RevocationResponse, RevokeRequest};
use crate::error::ApiResult;
use crate::state::AppState;

const REVOKE_REASON_MAX_LENGTH: usize = 200;

pub async fn list_requests_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PrivilegeRequestResponse>>> {
    let requests = state.lifecycle.list().await?;

    Ok(Json(
        requests.iter().map(PrivilegeRequestResponse::from).collect(),
    ))
}

pub async fn decide_request_handler(
    State(state): State<AppState>,
    Extension(approver): Extension<ApproverIdentity>,
    Path(request_id): Path<String>,
    Json(payload): Json<DecisionRequest>,
) -> ApiResult<Json<PrivilegeRequestResponse>> {
    let id = RequestId::parse(request_id.as_str())?;
    let decision = ApprovalAction::from_str(payload.decision.trim())?;

    let request = state
        .lifecycle
        .decide(id, decision, Some(approver.subject()))
        .await?;

    Ok(Json(PrivilegeRequestResponse::from(&request)))
}

pub async fn revoke_request_handler(
    State(state): State<AppState>,
    Extension(approver): Extension<ApproverIdentity>,
    Path(request_id): Path<String>,
    Json(payload): Json<RevokeRequest>,
) -> ApiResult<Json<RevocationResponse>> {
    let id = RequestId::parse(request_id.as_str())?;
    let reason = revoke_reason(&approver, payload.reason.as_deref())?;

    let response = match state.lifecycle.revoke(id, reason.as_str()).await? {
        Revocation::Revoked(request) => RevocationResponse {
            id: id.to_string(),
            revoked: true,
            status: request.status().as_str().to_owned(),
        },
        Revocation::Skipped { status } => RevocationResponse {
            id: id.to_string(),
            revoked: false,
            status: status.as_str().to_owned(),
        },
    };

    Ok(Json(response))
}

fn revoke_reason(approver: &ApproverIdentity, reason: Option<&str>) -> Result<String, AppError> {
    match reason.map(str::trim).filter(|reason| !reason.is_empty()) {
        Some(reason) if reason.chars().count() > REVOKE_REASON_MAX_LENGTH => {
            Err(AppError::validation(format!(
                "revocation reason must be at most {REVOKE_REASON_MAX_LENGTH} characters"
            )))
        }
        Some(reason) => Ok(format!("{reason} (by {})", approver.subject())),
        None => Ok(format!("revoked by {}", approver.subject())),
    }
}

/// Live lifecycle feed for the dashboard.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.live_events.subscribe();

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match dashboard_event(&event) {
                    Ok(sse_event) => {
                        return Some((Ok::<Event, Infallible>(sse_event), receiver));
                    }
                    Err(error) => {
                        warn!(
                            error = %error,
                            kind = event.kind(),
                            "failed to encode dashboard event"
                        );
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dashboard event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn dashboard_event(event: &LifecycleEvent) -> Result<Event, AppError> {
    let payload = redacted_payload(event)?;
    Event::default()
        .event(event.kind())
        .json_data(payload)
        .map_err(|error| AppError::Internal(format!("failed to encode sse event: {error}")))
}

/// Serializes an event without its approval tokens; the dashboard decides through its own route.
fn redacted_payload(event: &LifecycleEvent) -> Result<Value, AppError> {
    let mut payload = serde_json::to_value(event)
        .map_err(|error| AppError::Internal(format!("failed to encode lifecycle event: {error}")))?;
    if let Some(fields) = payload.as_object_mut() {
        fields.remove("approveToken");
        fields.remove("denyToken");
    }
    Ok(payload)
}
