//! Transfer of a live AI call to a human agent
//!
//! The caller leg is redirected to the conference entry point, the agent is
//! dialed with an inline briefing document, and both meet in a conference
//! named after the caller's carrier call id.

use crate::application::callback_urls::CallbackUrls;
use crate::domain::carrier::{CallUpdate, CarrierClientFactory, OutboundCall};
use crate::domain::control_document::{ConferenceOptions, VoiceResponse};
use crate::domain::session::ActiveCallRegistry;
use crate::domain::system_of_record::{AuditEntry, SystemOfRecord, TransferAttemptLog, TransferGrant};
use crate::domain::transfer::{conference_name, parse_flag, TransferOutcome, TransferRequest};
use crate::domain::{DomainError, Result};
use metrics::counter;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Status callback events subscribed for the agent leg
pub const AGENT_LEG_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

const AGENT_BRIEFING: &str = "You are being connected to a user. Here's a quick summary.";
const CALLER_HOLD: &str = "Please wait a moment while I connect you to a human agent.";

/// Query of the conference entry point the caller leg is redirected to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConferenceEntry {
    #[serde(rename = "conferenceName", default)]
    pub conference_name: Option<String>,
    #[serde(rename = "mainCallSid", default)]
    pub main_call_sid: Option<String>,
    #[serde(rename = "companyid", default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub record: Option<String>,
    #[serde(default)]
    pub max_dur: Option<String>,
}

impl ConferenceEntry {
    pub fn record(&self) -> bool {
        self.record.as_deref().map(parse_flag).unwrap_or(false)
    }

    pub fn max_duration(&self) -> Option<u32> {
        self.max_dur
            .as_deref()
            .and_then(|d| d.trim().parse::<u32>().ok())
            .filter(|d| *d > 0)
    }
}

pub struct TransferInitiator {
    registry: Arc<dyn ActiveCallRegistry>,
    backend: Arc<dyn SystemOfRecord>,
    carriers: Arc<dyn CarrierClientFactory>,
    urls: CallbackUrls,
}

impl TransferInitiator {
    pub fn new(
        registry: Arc<dyn ActiveCallRegistry>,
        backend: Arc<dyn SystemOfRecord>,
        carriers: Arc<dyn CarrierClientFactory>,
        urls: CallbackUrls,
    ) -> Self {
        Self {
            registry,
            backend,
            carriers,
            urls,
        }
    }

    /// Hand the call over to the forwarding number
    pub async fn initiate(&self, request: &TransferRequest) -> TransferOutcome {
        if !request.is_call_forwarding {
            info!(ai_call_id = %request.ai_call_id, "Call forwarding is disabled");
            counter!("callbridge_transfers_total", "outcome" => "disabled").increment(1);
            return TransferOutcome::disabled();
        }

        let outcome = match self.transfer(request).await {
            Ok(()) => TransferOutcome::success(),
            Err(e) => {
                error!(ai_call_id = %request.ai_call_id, error = %e, "Error transferring call");
                self.audit_failure(request, &e).await;
                TransferOutcome::error(e.to_string())
            }
        };

        counter!("callbridge_transfers_total", "outcome" => outcome.status.as_str()).increment(1);
        outcome
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<()> {
        let session = self
            .registry
            .get(&request.ai_call_id)
            .await
            .ok_or_else(|| DomainError::NotFound("Call not found or invalid CallSid".to_string()))?;
        let main_call_sid = session
            .carrier_call_id()
            .ok_or_else(|| DomainError::NotFound("Call not found or invalid CallSid".to_string()))?
            .to_string();

        let grant = self
            .backend
            .log_transfer_attempt(&TransferAttemptLog::new(request, &main_call_sid))
            .await?;
        let credentials = grant.phone_credentials.clone().into_credentials()?;
        let carrier = self.carriers.client(&credentials);

        let conference = conference_name(&main_call_sid);
        let entry_point = self.urls.transfer_entry_point(
            &conference,
            &request.tenant_id,
            &main_call_sid,
            grant.recording_enabled,
            grant.max_conference_duration,
        );
        carrier
            .update_call(&main_call_sid, CallUpdate::Redirect { url: entry_point })
            .await?;
        info!(%main_call_sid, %conference, "Caller redirected to conference entry point");

        let outbound = OutboundCall {
            to: request.forwarding_mobile_number.clone(),
            from: request.from_number.clone(),
            twiml: self.agent_document(request, &conference, &main_call_sid, &grant),
            status_callback: self.urls.transfer_status(&main_call_sid),
            status_callback_events: AGENT_LEG_EVENTS.iter().map(|e| e.to_string()).collect(),
        };
        let agent_leg = carrier.create_call(&outbound).await?;
        info!(
            %main_call_sid,
            agent_call_sid = %agent_leg.sid,
            "Outbound call initiated to agent"
        );

        Ok(())
    }

    /// Control document joining the caller leg to its conference. The
    /// caller waits for the agent and never ends the conference.
    pub fn caller_document(&self, entry: &ConferenceEntry) -> Result<String> {
        let conference = entry
            .conference_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DomainError::ValidationError("conferenceName is required".to_string()))?;
        let main_call_sid = entry.main_call_sid.as_deref().unwrap_or_default();
        let tenant_id = entry.tenant_id.as_deref().unwrap_or_default();

        Ok(VoiceResponse::new()
            .say(CALLER_HOLD)
            .dial_conference(
                conference,
                entry.max_duration(),
                ConferenceOptions {
                    start_conference_on_enter: false,
                    end_conference_on_exit: false,
                    status_callback: self.urls.conference_status(conference, main_call_sid, tenant_id),
                    record: entry.record(),
                    recording_status_callback: self
                        .urls
                        .recording_status(conference, main_call_sid, tenant_id),
                },
            )
            .to_xml())
    }

    /// Briefing plus conference entry for the agent. The agent starts the
    /// conference and ends it on exit.
    fn agent_document(
        &self,
        request: &TransferRequest,
        conference: &str,
        main_call_sid: &str,
        grant: &TransferGrant,
    ) -> String {
        let mut document = VoiceResponse::new().say(AGENT_BRIEFING);
        if let Some(summary) = request
            .conversation_summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            document = document.say(summary);
        }

        document
            .dial_conference(
                conference,
                grant.max_conference_duration,
                ConferenceOptions {
                    start_conference_on_enter: true,
                    end_conference_on_exit: true,
                    status_callback: self.urls.conference_status(
                        conference,
                        main_call_sid,
                        &request.tenant_id,
                    ),
                    record: grant.recording_enabled,
                    recording_status_callback: self.urls.recording_status(
                        conference,
                        main_call_sid,
                        &request.tenant_id,
                    ),
                },
            )
            .to_xml()
    }

    async fn audit_failure(&self, request: &TransferRequest, e: &DomainError) {
        let payload = serde_json::json!({
            "ultravoxCallId": request.ai_call_id,
            "isCallForwarding": request.is_call_forwarding,
            "forwardingMobileNumber": request.forwarding_mobile_number,
            "firstname": request.firstname,
            "lastname": request.lastname,
            "transferReason": request.transfer_reason,
            "direction": request.direction,
            "companyid": request.tenant_id,
        });
        let entry = AuditEntry::new("Error transferring call", payload, e.to_string());
        if let Err(log_err) = self.backend.audit_log(&entry).await {
            warn!(error = %log_err, "Failed to write transfer audit log");
        }
    }
}
