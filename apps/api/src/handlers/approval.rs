//! Approval links opened from notification messages.
//!
//! Pages are static text; the outcome of a failed token is named but no
//! internal detail is rendered.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use serde::Deserialize;
use tempadmin_core::{AppError, TokenError};
use tempadmin_domain::RequestStatus;
use tracing::{error, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApprovalQuery {
    #[serde(default)]
    token: Option<String>,
}

pub async fn approval_link_handler(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQuery>,
) -> (StatusCode, Html<String>) {
    let token = query.token.unwrap_or_default();

    match state.lifecycle.decide_by_token(token.trim()).await {
        Ok(request) => {
            let (title, message) = match request.status() {
                RequestStatus::Denied => (
                    "Request denied",
                    "The request was denied. No privileges were granted.",
                ),
                _ => (
                    "Request approved",
                    "The request was approved. The requester can now activate it.",
                ),
            };
            (StatusCode::OK, page(title, message))
        }
        Err(error) => failure_page(&error),
    }
}

fn failure_page(error: &AppError) -> (StatusCode, Html<String>) {
    let (status, title, message) = match error {
        AppError::Token(token_error) => {
            let message = match token_error {
                TokenError::Missing => "The link does not contain an approval token.",
                TokenError::Malformed => {
                    "The approval link is damaged. Open it from the original message."
                }
                TokenError::SignatureInvalid => "The approval link could not be verified.",
                TokenError::Expired => {
                    "The approval link has expired. Ask the requester to submit again."
                }
                TokenError::AlreadyUsed => "A decision was already recorded with this link.",
                TokenError::Unknown => "The approval link is no longer valid.",
            };
            (StatusCode::BAD_REQUEST, "Link not accepted", message)
        }
        AppError::NotFound(_) | AppError::InvalidTransition(_) => {
            warn!(error = %error, "approval link could not be applied");
            (
                StatusCode::CONFLICT,
                "Request unavailable",
                "This request can no longer be decided.",
            )
        }
        _ => {
            error!(error = %error, "approval link failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "The decision could not be recorded. Try again shortly.",
            )
        }
    };

    (status, page(title, message))
}

fn page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title}</title></head>\
         <body><main><h1>{title}</h1><p>{message}</p></main></body></html>\n"
    ))
}

#[cfg(test)]
mod tests {
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use tempadmin_core::AppResult;
    use tempadmin_domain::RequestStatus;

    use super::{ApprovalQuery, approval_link_handler};
    use crate::handlers::test_support::TestApp;

    fn query(token: &str) -> Query<ApprovalQuery> {
        Query(ApprovalQuery {
            token: Some(token.to_owned()),
        })
    }

    #[tokio::test]
    async fn approve_link_applies_once() -> AppResult<()> {
        let app = TestApp::new()?;
        let submitted = app.submit_with_tokens("alice").await?;

        let (status, body) = approval_link_handler(
            State(app.state.clone()),
            query(submitted.approve_token.token.as_str()),
        )
        .await;
        let (replay_status, replay_body) = approval_link_handler(
            State(app.state.clone()),
            query(submitted.approve_token.token.as_str()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.0.contains("Request approved"));
        assert_eq!(replay_status, StatusCode::BAD_REQUEST);
        assert!(replay_body.0.contains("already recorded"));
        assert_eq!(
            app.state.lifecycle.find(submitted.request.id()).await?.status(),
            RequestStatus::Approved
        );
        Ok(())
    }

    #[tokio::test]
    async fn deny_link_burns_the_approve_link() -> AppResult<()> {
        let app = TestApp::new()?;
        let submitted = app.submit_with_tokens("alice").await?;

        let (deny_status, deny_body) = approval_link_handler(
            State(app.state.clone()),
            query(submitted.deny_token.token.as_str()),
        )
        .await;
        let (approve_status, _) = approval_link_handler(
            State(app.state.clone()),
            query(submitted.approve_token.token.as_str()),
        )
        .await;

        assert_eq!(deny_status, StatusCode::OK);
        assert!(deny_body.0.contains("Request denied"));
        assert_eq!(approve_status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn missing_and_garbage_tokens_render_distinct_pages() -> AppResult<()> {
        let app = TestApp::new()?;

        let (missing_status, missing_body) = approval_link_handler(
            State(app.state.clone()),
            Query(ApprovalQuery { token: None }),
        )
        .await;
        let (garbage_status, garbage_body) =
            approval_link_handler(State(app.state.clone()), query("%%%not-a-token")).await;

        assert_eq!(missing_status, StatusCode::BAD_REQUEST);
        assert_eq!(garbage_status, StatusCode::BAD_REQUEST);
        assert!(missing_body.0.contains("does not contain"));
        assert!(garbage_body.0.contains("damaged"));
        Ok(())
    }
}
