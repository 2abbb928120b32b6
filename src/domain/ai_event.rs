//! Lifecycle events pushed by the AI provider

use serde_json::Value;

pub const CALL_ENDED: &str = "call.ended";

/// A provider webhook delivery. The raw body is kept as-is because the
/// session log stores it whole.
#[derive(Debug, Clone, PartialEq)]
pub struct AiEvent {
    body: Value,
}

impl AiEvent {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn event_type(&self) -> Option<&str> {
        self.body.get("event").and_then(Value::as_str)
    }

    pub fn is_call_ended(&self) -> bool {
        self.event_type() == Some(CALL_ENDED)
    }

    /// `call.callId`
    pub fn ai_call_id(&self) -> Option<&str> {
        self.body
            .pointer("/call/callId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// `call.metadata.COMPANYID`
    pub fn tenant_id(&self) -> Option<&str> {
        self.body
            .pointer("/call/metadata/COMPANYID")
            .and_then(Value::as_str)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// What became of a provider event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiEventOutcome {
    /// Not a `call.ended` event, or one without a call id
    Ignored,
    /// The session log already exists under this document name
    AlreadyHandled(String),
    Logged,
    Failed(String),
}

impl AiEventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiEventOutcome::Ignored => "ignored",
            AiEventOutcome::AlreadyHandled(_) => "already_handled",
            AiEventOutcome::Logged => "logged",
            AiEventOutcome::Failed(_) => "failed",
        }
    }
}
