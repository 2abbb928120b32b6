//! Agent-initiated hangup

use super::assessment::AssessmentBundle;
use serde::{Deserialize, Serialize};

/// Hangup tool invocation, as sent by the AI session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangupRequest {
    #[serde(rename = "callId", default)]
    pub ai_call_id: String,
    #[serde(rename = "companyid", default)]
    pub tenant_id: String,
    #[serde(default)]
    pub to_number: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(flatten)]
    pub assessment: AssessmentBundle,
}

/// Result of a hangup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HangupOutcome {
    /// Carrier leg completed and the call-ended record submitted
    Completed,
    /// No live session (or no carrier leg) for the AI call id
    CallNotFound,
    /// Credential lookup, carrier update or record submission failed
    Failed(String),
}

impl HangupOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            HangupOutcome::Completed => 200,
            HangupOutcome::CallNotFound => 404,
            HangupOutcome::Failed(_) => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HangupOutcome::Completed => "completed",
            HangupOutcome::CallNotFound => "not_found",
            HangupOutcome::Failed(_) => "failed",
        }
    }
}
