//! System-of-record port
//!
//! The backend owns tenants, credentials and every durable log. All calls
//! are plain request/response round-trips.

use super::assessment::AssessmentBundle;
use super::carrier::CarrierCredentials;
use super::conference::ConferenceSummary;
use super::hangup::HangupRequest;
use super::recording::RecordingRecord;
use super::shared::{CallbackFields, Result};
use super::transfer::TransferRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Carrier credentials as stored for a tenant or phone number
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PhoneCredentials {
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
}

impl PhoneCredentials {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            twilio_account_sid: Some(account_sid.into()),
            twilio_auth_token: Some(auth_token.into()),
        }
    }

    /// Complete credentials, or `MissingCredentials`
    pub fn into_credentials(self) -> Result<CarrierCredentials> {
        CarrierCredentials::from_parts(
            self.twilio_account_sid.as_deref(),
            self.twilio_auth_token.as_deref(),
        )
    }
}

impl std::fmt::Debug for PhoneCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneCredentials")
            .field("twilio_account_sid", &self.twilio_account_sid)
            .field(
                "twilio_auth_token",
                &self.twilio_auth_token.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Transfer policy returned by the transfer-attempt log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferGrant {
    pub phone_credentials: PhoneCredentials,
    pub recording_enabled: bool,
    pub max_conference_duration: Option<u32>,
}

/// Audit record of a transfer attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAttemptLog {
    pub callid: String,
    pub twilio_call_sid: String,
    pub from_number: String,
    pub to_number: String,
    pub forwarding_mobile_number: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub transfer_reason: Option<String>,
    pub is_call_forwarding: bool,
    pub direction: Option<String>,
    pub companyid: String,
    pub conversation_summary: Option<String>,
    #[serde(flatten)]
    pub assessment: AssessmentBundle,
}

impl TransferAttemptLog {
    pub fn new(request: &TransferRequest, carrier_call_id: &str) -> Self {
        Self {
            callid: request.ai_call_id.clone(),
            twilio_call_sid: carrier_call_id.to_string(),
            from_number: request.from_number.clone(),
            to_number: request.to_number.clone(),
            forwarding_mobile_number: request.forwarding_mobile_number.clone(),
            firstname: request.firstname.clone(),
            lastname: request.lastname.clone(),
            transfer_reason: request.transfer_reason.clone(),
            is_call_forwarding: request.is_call_forwarding,
            direction: request.direction.clone(),
            companyid: request.tenant_id.clone(),
            conversation_summary: request.conversation_summary.clone(),
            assessment: request.assessment.clone(),
        }
    }
}

/// Free-form audit entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub error_text: String,
    pub request_payload: serde_json::Value,
    pub company_found: String,
}

impl AuditEntry {
    pub fn new(
        error_text: impl Into<String>,
        request_payload: serde_json::Value,
        company_found: impl Into<String>,
    ) -> Self {
        Self {
            error_text: error_text.into(),
            request_payload,
            company_found: company_found.into(),
        }
    }
}

/// "Call ended by agent" record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndedLog {
    pub callid: String,
    pub hangup_by: String,
    pub companyid: String,
    pub to_number: String,
    pub from_number: String,
    pub direction: Option<String>,
    #[serde(flatten)]
    pub assessment: AssessmentBundle,
}

impl CallEndedLog {
    pub fn by_agent(request: &HangupRequest) -> Self {
        Self {
            callid: request.ai_call_id.clone(),
            hangup_by: "Agent".to_string(),
            companyid: request.tenant_id.clone(),
            to_number: request.to_number.clone(),
            from_number: request.from_number.clone(),
            direction: request.direction.clone(),
            assessment: request.assessment.clone(),
        }
    }
}

/// What the backend provides to start an AI session for a dialed number
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSessionBundle {
    pub ai_api_key: String,
    pub call_config: serde_json::Value,
}

/// Periodic active-call telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveCallReport {
    pub active_call: usize,
    pub pick_count: usize,
    pub direction: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    /// Record a transfer attempt and get the tenant's carrier credentials
    /// and transfer policy back in the same round-trip
    async fn log_transfer_attempt(&self, attempt: &TransferAttemptLog) -> Result<TransferGrant>;

    /// Carrier credentials of a tenant
    async fn credentials_for_tenant(&self, tenant_id: &str) -> Result<PhoneCredentials>;

    /// Carrier credentials of the account owning a phone number
    async fn credentials_for_number(&self, phone_number: &str) -> Result<PhoneCredentials>;

    /// Write a free-form audit entry
    async fn audit_log(&self, entry: &AuditEntry) -> Result<()>;

    /// Record a conference participant-join event
    async fn log_conference_participant(&self, event: &CallbackFields) -> Result<()>;

    /// Call leg ids that took part in the conversation of `event.mainCallSid`
    async fn conference_party(&self, event: &CallbackFields) -> Result<Vec<String>>;

    /// Submit the consolidated conference summary
    async fn log_conference_end(&self, summary: &ConferenceSummary) -> Result<()>;

    /// Record an agent-initiated hangup
    async fn log_call_ended(&self, record: &CallEndedLog) -> Result<()>;

    /// Record a per-leg transfer status callback
    async fn log_transfer_status(&self, event: &CallbackFields) -> Result<()>;

    /// Store a completed recording
    async fn log_recording(&self, recording: &RecordingRecord) -> Result<()>;

    /// AI session bundle for the dialed number, if the number is served
    async fn voice_session(&self, called_number: &str) -> Result<Option<VoiceSessionBundle>>;

    /// Report the number of active calls
    async fn log_active_calls(&self, report: &ActiveCallReport) -> Result<()>;

    /// Name of the session log already stored for an AI call, if any
    async fn handled_call_session<'a>(
        &self,
        ai_call_id: &str,
        tenant_id: Option<&'a str>,
    ) -> Result<Option<String>>;

    /// Store the provider's end-of-call event as a session log
    async fn log_call_session(&self, event: &serde_json::Value) -> Result<()>;
}
