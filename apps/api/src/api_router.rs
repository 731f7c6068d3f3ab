use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tempadmin_core::AppResult;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(app_state: AppState, dashboard_url: &str) -> AppResult<Router> {
    let requester_routes = Router::new()
        .route(
            "/api/requests",
            post(handlers::requests::submit_request_handler),
        )
        .route(
            "/api/requests/{request_id}",
            get(handlers::requests::request_status_handler),
        )
        .route(
            "/api/requests/{request_id}/activate",
            post(handlers::requests::activate_request_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_requester_auth,
        ));

    let dashboard_routes = Router::new()
        .route(
            "/api/dashboard/requests",
            get(handlers::dashboard::list_requests_handler),
        )
        .route(
            "/api/dashboard/requests/{request_id}/decision",
            post(handlers::dashboard::decide_request_handler),
        )
        .route(
            "/api/dashboard/requests/{request_id}/revoke",
            post(handlers::dashboard::revoke_request_handler),
        )
        .route(
            "/api/dashboard/events",
            get(handlers::dashboard::events_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_dashboard_auth,
        ))
        .layer(cors::build_dashboard_cors_layer(dashboard_url)?);

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/approval",
            get(handlers::approval::approval_link_handler),
        )
        .route(
            "/api/webhooks/decision",
            post(handlers::webhook::webhook_decision_handler),
        )
        .merge(requester_routes)
        .merge(dashboard_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
