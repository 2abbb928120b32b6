//! API Router configuration

use super::ai_webhooks::ai_call_ended;
use super::metrics_handler::metrics_handler;
use super::state::AppState;
use super::tools::{hang_up_call, transfer_call};
use super::webhooks::{
    call_status, conference_status, health, incoming, recording_status,
    transfer_conference_entry_point, transfer_status,
};
use crate::application::callback_urls::{AI_WEBHOOK_PREFIX, WEBHOOK_PREFIX};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Carrier webhooks
    let webhook_routes = Router::new()
        .route("/incoming", post(incoming))
        .route(
            "/transfer-conference-entry-point",
            get(transfer_conference_entry_point).post(transfer_conference_entry_point),
        )
        .route("/conference-status", post(conference_status))
        .route("/recording-status", post(recording_status))
        .route("/transfer-status", post(transfer_status))
        .route("/callStatus", post(call_status))
        .route("/health", get(health));

    // AI tool endpoints
    let tool_routes = Router::new()
        .route("/transferCall", post(transfer_call))
        .route("/hangUpCall", post(hang_up_call));

    // AI provider webhooks
    let ai_webhook_routes = Router::new().route("/callend", post(ai_call_ended));

    // Metrics route
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .nest(WEBHOOK_PREFIX, webhook_routes.merge(tool_routes))
        .nest(AI_WEBHOOK_PREFIX, ai_webhook_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}
