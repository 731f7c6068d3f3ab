use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use tempadmin_core::{AppError, AppResult};
use tower_http::cors::CorsLayer;

use crate::middleware::{APPROVER_HEADER, APPROVER_NAME_HEADER};

pub(super) fn build_dashboard_cors_layer(dashboard_url: &str) -> AppResult<CorsLayer> {
    let origin = HeaderValue::from_str(dashboard_url.trim_end_matches('/'))
        .map_err(|error| AppError::validation(format!("invalid DASHBOARD_URL: {error}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(APPROVER_HEADER),
            HeaderName::from_static(APPROVER_NAME_HEADER),
        ]))
}
