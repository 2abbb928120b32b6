//! Carrier webhook handlers
//!
//! Every handler answers the carrier; failures are logged and mapped to the
//! status codes the carrier expects, never propagated as rejections.

use super::callback::{callback_fields, lenient_query, twiml};
use super::state::AppState;
use crate::application::{CallStatusUpdate, ConferenceEntry};
use crate::domain::conference::ConferenceContext;
use crate::domain::control_document::VoiceResponse;
use crate::domain::DomainError;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

const CONFERENCE_NAME_MISSING: &str = "Conference name is missing. Please try again.";

#[derive(Debug, Default, Deserialize)]
pub struct TransferStatusQuery {
    #[serde(rename = "mainCallSid", default)]
    pub main_call_sid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallStatusQuery {
    #[serde(rename = "callId", default)]
    pub call_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_calls: usize,
    pub base_url: String,
}

/// New inbound call: start the AI session and bridge the audio to it
pub async fn incoming(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let fields = callback_fields(&headers, &body);
    info!(
        call_sid = fields.get("CallSid").unwrap_or_default(),
        called = fields.get("Called").or(fields.get("To")).unwrap_or_default(),
        "Incoming call"
    );

    twiml(StatusCode::OK, state.lifecycle.incoming(&fields).await)
}

/// Caller leg redirected here by a transfer: park it in the conference
pub async fn transfer_conference_entry_point(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let entry: ConferenceEntry = lenient_query(query.as_deref());

    match state.transfers.caller_document(&entry) {
        Ok(document) => twiml(StatusCode::OK, document),
        Err(e) => {
            warn!(error = %e, "Conference entry point without conference name");
            twiml(
                StatusCode::BAD_REQUEST,
                VoiceResponse::new().say(CONFERENCE_NAME_MISSING).to_xml(),
            )
        }
    }
}

/// Conference lifecycle events
pub async fn conference_status(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let context: ConferenceContext = lenient_query(query.as_deref());
    let fields = callback_fields(&headers, &body);

    match state.conferences.handle(&context, &fields).await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(DomainError::MissingCredentials(tenant)) => {
            error!(%tenant, "Carrier credentials missing for conference callback");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error: Twilio credentials missing").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to handle conference status");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
        }
    }
}

/// Recording finished (or failed) for a transfer conference
pub async fn recording_status(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let context: ConferenceContext = lenient_query(query.as_deref());
    let fields = callback_fields(&headers, &body);

    if let Err(e) = state.reconciler.recording_status(&context, &fields).await {
        error!(error = %e, "Failed to forward recording status");
    }

    twiml(StatusCode::OK, VoiceResponse::new().to_xml())
}

/// Progress of the agent leg dialed by a transfer
pub async fn transfer_status(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params: TransferStatusQuery = lenient_query(query.as_deref());
    let fields = callback_fields(&headers, &body);

    if let Err(e) = state
        .reconciler
        .transfer_status(params.main_call_sid.as_deref(), &fields)
        .await
    {
        error!(error = %e, "Failed to forward transfer status");
    }

    twiml(StatusCode::OK, VoiceResponse::new().to_xml())
}

/// Status of the original inbound leg
pub async fn call_status(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params: CallStatusQuery = lenient_query(query.as_deref());
    let fields = callback_fields(&headers, &body);

    match state
        .lifecycle
        .call_status(params.call_id.as_deref(), &fields)
        .await
    {
        Ok(update) => {
            if let CallStatusUpdate::Removed(session) = update {
                info!(ai_call_id = %session.ai_call_id, "Call ended");
            }
            StatusCode::OK.into_response()
        }
        Err(DomainError::ValidationError(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to handle call status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_calls: state.lifecycle.active_calls().await,
        base_url: state.urls.base_url().to_string(),
    })
}
