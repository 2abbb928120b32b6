//! Warm transfer of a live AI call to a human agent

use super::assessment::AssessmentBundle;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of every transfer conference name
pub const CONFERENCE_PREFIX: &str = "conference_";

/// Conference name for a main call leg.
///
/// Deterministic in the carrier call id, so a retried redirect lands in the
/// same conference.
pub fn conference_name(main_call_sid: &str) -> String {
    format!("{}{}", CONFERENCE_PREFIX, main_call_sid)
}

/// Transfer tool invocation, as sent by the AI session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(rename = "callId", default)]
    pub ai_call_id: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_call_forwarding: bool,
    #[serde(default)]
    pub forwarding_mobile_number: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub transfer_reason: Option<String>,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub to_number: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(rename = "companyid", default)]
    pub tenant_id: String,
    #[serde(default)]
    pub conversation_summary: Option<String>,
    #[serde(flatten)]
    pub assessment: AssessmentBundle,
}

/// Result status of a transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "false")]
    Disabled,
    #[serde(rename = "error")]
    Error,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Success => "success",
            TransferStatus::Disabled => "false",
            TransferStatus::Error => "error",
        }
    }
}

/// Outcome returned to the tool caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub status: TransferStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferOutcome {
    pub fn success() -> Self {
        Self {
            status: TransferStatus::Success,
            message: "Call transfer initiated".to_string(),
            error: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            status: TransferStatus::Disabled,
            message: "Call forwarding is disabled".to_string(),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: TransferStatus::Error,
            message: "Failed to transfer call".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TransferStatus::Success
    }
}

/// Parse a loosely typed boolean flag ("true", "1", "yes")
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Accepts JSON booleans as well as the string and numeric spellings AI
/// tool calls tend to produce.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(s)) => parse_flag(&s),
        None => false,
    })
}
