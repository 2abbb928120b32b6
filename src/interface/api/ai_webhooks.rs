//! AI provider webhooks
//!
//! Signed deliveries are always answered 200 so the provider stops
//! retrying; the outcome is carried in the body.

use super::state::AppState;
use crate::domain::ai_event::{AiEvent, AiEventOutcome};
use crate::infrastructure::ai::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AiWebhookResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<AiEventOutcome> for AiWebhookResponse {
    fn from(outcome: AiEventOutcome) -> Self {
        match outcome {
            AiEventOutcome::Ignored => Self {
                success: true,
                ignored: Some(true),
                ..Default::default()
            },
            AiEventOutcome::AlreadyHandled(docname) => Self {
                success: true,
                message: Some("Call session already handled".to_string()),
                docname: Some(docname),
                ..Default::default()
            },
            AiEventOutcome::Logged => Self {
                success: true,
                ..Default::default()
            },
            AiEventOutcome::Failed(error) => Self {
                success: false,
                error: Some(error),
                ..Default::default()
            },
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// End-of-call event of an AI session
pub async fn ai_call_ended(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = state.webhook_verifier.verify(
        &body,
        header(&headers, TIMESTAMP_HEADER),
        header(&headers, SIGNATURE_HEADER),
    ) {
        warn!(reason = %e, "Rejected AI provider webhook");
        let rejection = AiWebhookResponse {
            success: false,
            message: Some(e.to_string()),
            ..Default::default()
        };
        return (StatusCode::FORBIDDEN, Json(rejection)).into_response();
    }

    let event = AiEvent::new(serde_json::from_slice(&body).unwrap_or(Value::Null));
    let outcome = state.ai_events.handle(&event).await;

    (StatusCode::OK, Json(AiWebhookResponse::from(outcome))).into_response()
}
