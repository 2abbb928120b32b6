//! Tool endpoints invoked by the AI session

use super::state::AppState;
use crate::domain::hangup::{HangupOutcome, HangupRequest};
use crate::domain::transfer::{TransferOutcome, TransferRequest, TransferStatus};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Hangup tool response
#[derive(Debug, Serialize, Deserialize)]
pub struct HangupResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HangupResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Transfer the live call to a human agent
pub async fn transfer_call(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> (StatusCode, Json<TransferOutcome>) {
    info!(
        ai_call_id = %request.ai_call_id,
        forwarding = request.is_call_forwarding,
        "API: Transfer requested"
    );

    let outcome = state.transfers.initiate(&request).await;
    let status = match outcome.status {
        TransferStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        TransferStatus::Success | TransferStatus::Disabled => StatusCode::OK,
    };

    (status, Json(outcome))
}

/// End the live call on behalf of the agent
pub async fn hang_up_call(
    State(state): State<AppState>,
    Json(request): Json<HangupRequest>,
) -> (StatusCode, Json<HangupResponse>) {
    info!(ai_call_id = %request.ai_call_id, "API: Hangup requested");

    let outcome = state.terminations.hangup(&request).await;
    let status = StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match outcome {
        HangupOutcome::Completed => HangupResponse::ok("Call ended successfully"),
        HangupOutcome::CallNotFound => HangupResponse::failed("Call not found or invalid Twilio SID"),
        HangupOutcome::Failed(_) => {
            HangupResponse::failed("Internal Server Error. Failed to hang up call.")
        }
    };

    (status, Json(body))
}
