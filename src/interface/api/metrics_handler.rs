//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and describe the bridge metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Handle of a recorder that is not installed globally
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn describe_metrics() {
    describe_gauge!(
        "callbridge_active_calls",
        "Number of inbound calls with a live AI session"
    );
    describe_counter!(
        "callbridge_transfers_total",
        "Transfer requests by outcome"
    );
    describe_counter!(
        "callbridge_conference_events_total",
        "Conference status callbacks by event"
    );
    describe_counter!(
        "callbridge_conference_teardowns_total",
        "Conferences force-ended after a participant left"
    );
    describe_counter!(
        "callbridge_recordings_total",
        "Recording callbacks by status"
    );
    describe_counter!(
        "callbridge_hangups_total",
        "Agent hangup requests by outcome"
    );
    describe_counter!(
        "callbridge_ai_events_total",
        "AI provider webhook events by outcome"
    );
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    (StatusCode::OK, prometheus_handle.render()).into_response()
}
