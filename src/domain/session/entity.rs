//! Call session entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the original call leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "INBOUND",
            CallDirection::Outbound => "OUTBOUND",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INBOUND" => Some(CallDirection::Inbound),
            "OUTBOUND" => Some(CallDirection::Outbound),
            _ => None,
        }
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// A live AI-driven call, keyed by the AI session identifier.
///
/// Created when the AI session starts and never mutated afterwards; the
/// registry drops it once the carrier reports the call leg as terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub ai_call_id: String,
    pub carrier_call_id: String,
    pub created_at: DateTime<Utc>,
    pub direction: CallDirection,
    pub status: SessionStatus,
}

impl CallSession {
    pub fn new(
        ai_call_id: impl Into<String>,
        carrier_call_id: impl Into<String>,
        direction: CallDirection,
    ) -> Self {
        Self {
            ai_call_id: ai_call_id.into(),
            carrier_call_id: carrier_call_id.into(),
            created_at: Utc::now(),
            direction,
            status: SessionStatus::Active,
        }
    }

    /// Carrier call leg identifier, if one was recorded
    pub fn carrier_call_id(&self) -> Option<&str> {
        Some(self.carrier_call_id.as_str()).filter(|sid| !sid.trim().is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
