use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tempadmin_core::{AppError, AppResult, ApproverIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the approver subject resolved by the dashboard login.
pub const APPROVER_HEADER: &str = "x-tempadmin-approver";
/// Optional header carrying the approver display name.
pub const APPROVER_NAME_HEADER: &str = "x-tempadmin-approver-name";

const APPROVER_SUBJECT_MAX_LENGTH: usize = 200;

pub async fn require_requester_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    check_bearer(request.headers(), &state.requester_secret)?;
    Ok(next.run(request).await)
}

pub async fn require_dashboard_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    check_bearer(request.headers(), &state.dashboard_secret)?;
    let approver = approver_from_headers(request.headers())?;

    request.extensions_mut().insert(approver);
    Ok(next.run(request).await)
}

fn check_bearer(headers: &HeaderMap, expected: &str) -> AppResult<()> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?;

    if bool::from(provided.trim().as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("bearer token rejected".to_owned()))
    }
}

fn approver_from_headers(headers: &HeaderMap) -> AppResult<ApproverIdentity> {
    let subject = header_text(headers, APPROVER_HEADER)
        .filter(|subject| subject.len() <= APPROVER_SUBJECT_MAX_LENGTH)
        .ok_or_else(|| AppError::Unauthorized("approver identity required".to_owned()))?;
    let display_name = header_text(headers, APPROVER_NAME_HEADER).unwrap_or(subject);

    Ok(ApproverIdentity::new(subject, display_name))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use tempadmin_core::{AppError, AppResult};

    use super::{APPROVER_HEADER, approver_from_headers, check_bearer};

    const SECRET: &str = "requester-secret-requester-secret";

    fn headers_with(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn matching_bearer_is_accepted() -> AppResult<()> {
        let headers = headers_with(&[(
            "authorization",
            "Bearer requester-secret-requester-secret",
        )]);

        check_bearer(&headers, SECRET)
    }

    #[test]
    fn missing_or_wrong_bearer_is_rejected() {
        let wrong = headers_with(&[("authorization", "Bearer other")]);
        let basic = headers_with(&[("authorization", "Basic abc")]);

        assert!(matches!(
            check_bearer(&HeaderMap::new(), SECRET),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_bearer(&wrong, SECRET),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_bearer(&basic, SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn approver_header_is_required_and_defaults_display_name() -> AppResult<()> {
        assert!(approver_from_headers(&HeaderMap::new()).is_err());
        assert!(approver_from_headers(&headers_with(&[(APPROVER_HEADER, "  ")])).is_err());

        let approver = approver_from_headers(&headers_with(&[(APPROVER_HEADER, "carol")]))?;
        assert_eq!(approver.subject(), "carol");
        assert_eq!(approver.display_name(), "carol");
        Ok(())
    }
}
