//! ERP REST client implementing the system-of-record port
//!
//! The ERP exposes whitelisted methods under one URL prefix. Every response
//! is wrapped in a `{"message": ...}` envelope.

use crate::config::BackendConfig;
use crate::domain::conference::ConferenceSummary;
use crate::domain::recording::RecordingRecord;
use crate::domain::system_of_record::{
    ActiveCallReport, AuditEntry, CallEndedLog, PhoneCredentials, SystemOfRecord,
    TransferAttemptLog, TransferGrant, VoiceSessionBundle,
};
use crate::domain::transfer::parse_flag;
use crate::domain::{CallbackFields, DomainError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

mod methods {
    pub const LOG_TRANSFER_ATTEMPT: &str = "aiagentapp.api.aiapi.log_TransferCall_gc";
    pub const TENANT_CREDENTIALS: &str = "aiagentapp.api.aiapi.get_ttoken_for_company";
    pub const NUMBER_CREDENTIALS: &str = "aiagentapp.api.aiapi.get_telecom_by_phone";
    pub const AUDIT_LOG: &str = "aiagentapp.api.aiapi.log_incoming_call_request";
    pub const CONFERENCE_STATUS: &str = "aiagentapp.api.aiapi.log_Conference_status";
    pub const CONFERENCE_PARTY: &str = "aiagentapp.api.aiapi.get_conf_party";
    pub const CONFERENCE_END: &str = "aiagentapp.api.aiapi.log_Conference_end";
    pub const CALL_ENDED: &str = "aiagentapp.api.aiapi.hangup_call_api";
    pub const TRANSFER_STATUS: &str = "aiagentapp.api.aiapi.log_TransferCall_status";
    pub const RECORDING: &str = "aiagentapp.api.aiapi.log_recording_status";
    pub const VOICE_SESSION: &str = "aiagentapp.api.aiapi.get_voice_session";
    pub const ACTIVE_CALLS: &str = "aiagentapp.api.outbound.create_call_active_log_api";
    pub const CALL_SESSION_EXISTS: &str = "aiagentapp.api.aiapi.check_doc_existwcomp";
    pub const CALL_SESSION_LOG: &str = "aiagentapp.api.aiapi.log_CallSessionLog";
}

#[derive(Deserialize)]
struct Envelope<T> {
    message: Option<T>,
}

#[derive(Deserialize)]
struct TransferGrantMessage {
    #[serde(default)]
    phone_credentials: PhoneCredentials,
    #[serde(default)]
    transfer_call_recording: Value,
    #[serde(default)]
    max_conf_duration: Value,
}

#[derive(Deserialize)]
struct NumberCredentialsMessage {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: PhoneCredentials,
}

#[derive(Deserialize)]
struct PartyMember {
    #[serde(default)]
    callsid: Option<String>,
}

#[derive(Deserialize)]
struct PartyMessage {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    party: Vec<PartyMember>,
}

#[derive(Deserialize)]
struct VoiceSessionMessage {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    ai_api_key: Option<String>,
    #[serde(default)]
    call_config: Value,
}

#[derive(Deserialize)]
struct SessionExistsMessage {
    #[serde(default)]
    success: bool,
    /// Document on success, an error string otherwise
    #[serde(default)]
    message: Value,
}

#[derive(Serialize)]
struct SessionExistsRequest<'a> {
    callid: &'a str,
    companyid: Option<&'a str>,
}

#[derive(Serialize)]
struct AuditRequest<'a> {
    error_text: &'a str,
    request_payload: String,
    company_found: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceEndRequest<'a> {
    api_payload: &'a ConferenceSummary,
}

/// `1`, `true` and `"1"`-like values
fn flag_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => parse_flag(s),
        _ => false,
    }
}

/// Positive duration in seconds from a number or numeric string
fn duration_value(value: &Value) -> Option<u32> {
    let secs = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(secs).ok().filter(|s| *s > 0)
}

pub struct ErpClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    audit_log_enabled: bool,
}

impl ErpClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DomainError::Internal(format!("failed to build HTTP client: {e}")))?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            authorization: format!("token {}:{}", config.api_key, config.api_secret),
            audit_log_enabled: config.audit_log_enabled,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| DomainError::Backend(format!("{method}: request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Backend(format!("{method} returned {status}: {body}")));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| DomainError::Backend(format!("{method}: invalid response: {e}")))?;
        if envelope.message.is_none() {
            debug!(method, "Backend returned no message");
        }
        Ok(envelope.message)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<Option<T>> {
        self.send(method, self.http.post(self.endpoint(method)).json(body))
            .await
    }

    /// POST where only success matters
    async fn submit<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<()> {
        self.post::<B, Value>(method, body).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<Option<T>> {
        self.send(method, self.http.get(self.endpoint(method)).query(query))
            .await
    }
}

#[async_trait]
impl SystemOfRecord for ErpClient {
    async fn log_transfer_attempt(&self, attempt: &TransferAttemptLog) -> Result<TransferGrant> {
        let message: TransferGrantMessage = self
            .post(methods::LOG_TRANSFER_ATTEMPT, attempt)
            .await?
            .ok_or_else(|| DomainError::Backend("transfer attempt log returned no message".to_string()))?;

        Ok(TransferGrant {
            phone_credentials: message.phone_credentials,
            recording_enabled: flag_value(&message.transfer_call_recording),
            max_conference_duration: duration_value(&message.max_conf_duration),
        })
    }

    async fn credentials_for_tenant(&self, tenant_id: &str) -> Result<PhoneCredentials> {
        Ok(self
            .get(methods::TENANT_CREDENTIALS, &[("companyid", tenant_id)])
            .await?
            .unwrap_or_default())
    }

    async fn credentials_for_number(&self, phone_number: &str) -> Result<PhoneCredentials> {
        let message: Option<NumberCredentialsMessage> = self
            .get(methods::NUMBER_CREDENTIALS, &[("phone_number", phone_number)])
            .await?;
        match message {
            Some(message) if message.success => Ok(message.data),
            _ => {
                warn!(%phone_number, "No telecom record for number");
                Ok(PhoneCredentials::default())
            }
        }
    }

    async fn audit_log(&self, entry: &AuditEntry) -> Result<()> {
        if !self.audit_log_enabled {
            return Ok(());
        }
        self.submit(
            methods::AUDIT_LOG,
            &AuditRequest {
                error_text: &entry.error_text,
                request_payload: entry.request_payload.to_string(),
                company_found: &entry.company_found,
            },
        )
        .await
    }

    async fn log_conference_participant(&self, event: &CallbackFields) -> Result<()> {
        self.submit(methods::CONFERENCE_STATUS, event).await
    }

    async fn conference_party(&self, event: &CallbackFields) -> Result<Vec<String>> {
        let message: Option<PartyMessage> = self.post(methods::CONFERENCE_PARTY, event).await?;
        match message {
            Some(message) if message.success => Ok(message
                .party
                .into_iter()
                .filter_map(|member| member.callsid)
                .collect()),
            _ => {
                warn!(main_call_sid = ?event.get("mainCallSid"), "No conference party returned");
                Ok(Vec::new())
            }
        }
    }

    async fn log_conference_end(&self, summary: &ConferenceSummary) -> Result<()> {
        self.submit(
            methods::CONFERENCE_END,
            &ConferenceEndRequest {
                api_payload: summary,
            },
        )
        .await
    }

    async fn log_call_ended(&self, record: &CallEndedLog) -> Result<()> {
        self.submit(methods::CALL_ENDED, record).await
    }

    async fn log_transfer_status(&self, event: &CallbackFields) -> Result<()> {
        self.submit(methods::TRANSFER_STATUS, event).await
    }

    async fn log_recording(&self, recording: &RecordingRecord) -> Result<()> {
        self.submit(methods::RECORDING, recording).await
    }

    async fn voice_session(&self, called_number: &str) -> Result<Option<VoiceSessionBundle>> {
        let message: Option<VoiceSessionMessage> = self
            .get(methods::VOICE_SESSION, &[("phone_number", called_number)])
            .await?;

        Ok(message
            .filter(|m| m.success)
            .and_then(|m| {
                let key = m.ai_api_key.filter(|k| !k.trim().is_empty())?;
                Some(VoiceSessionBundle {
                    ai_api_key: key,
                    call_config: m.call_config,
                })
            }))
    }

    async fn log_active_calls(&self, report: &ActiveCallReport) -> Result<()> {
        self.submit(methods::ACTIVE_CALLS, report).await
    }

    async fn handled_call_session<'a>(
        &self,
        ai_call_id: &str,
        tenant_id: Option<&'a str>,
    ) -> Result<Option<String>> {
        let message: Option<SessionExistsMessage> = self
            .post(
                methods::CALL_SESSION_EXISTS,
                &SessionExistsRequest {
                    callid: ai_call_id,
                    companyid: tenant_id,
                },
            )
            .await?;

        Ok(message
            .filter(|m| m.success)
            .and_then(|m| m.message.get("name").and_then(Value::as_str).map(str::to_string))
            .filter(|name| !name.is_empty()))
    }

    async fn log_call_session(&self, event: &Value) -> Result<()> {
        self.submit(methods::CALL_SESSION_LOG, event).await
    }
}
