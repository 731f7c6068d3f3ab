use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use tempadmin_core::AppError;
use tempadmin_infrastructure::SIGNATURE_HEADER;

use crate::dto::{PrivilegeRequestResponse, WebhookDecisionRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// Applies a decision relayed by the external approval channel.
///
/// The signature covers the raw body and is checked before the body is parsed.
pub async fn webhook_decision_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<PrivilegeRequestResponse>> {
    let signer = state
        .webhook_signer
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("webhook callbacks are not enabled".to_owned()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    signer.verify(&body, signature)?;

    let payload: WebhookDecisionRequest = serde_json::from_slice(&body)
        .map_err(|error| AppError::validation(format!("invalid webhook payload: {error}")))?;
    let request = state.lifecycle.decide_by_token(payload.token.trim()).await?;

    Ok(Json(PrivilegeRequestResponse::from(&request)))
}
