//! Conference presence tracking
//!
//! Each carrier event is handled on its own. Deliveries for one conference
//! can arrive in any order and more than once, so every branch re-reads the
//! carrier and the system of record instead of trusting earlier events.

use crate::domain::carrier::{CarrierClient, CarrierClientFactory};
use crate::domain::conference::{
    ConferenceContext, ConferenceEvent, ConferencePolicy, ConferenceSummary, LeaveAction,
    ParticipantLeg,
};
use crate::domain::system_of_record::SystemOfRecord;
use crate::domain::{CallbackFields, DomainError, Result};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ConferencePresenceTracker {
    backend: Arc<dyn SystemOfRecord>,
    carriers: Arc<dyn CarrierClientFactory>,
    policy: ConferencePolicy,
}

impl ConferencePresenceTracker {
    pub fn new(
        backend: Arc<dyn SystemOfRecord>,
        carriers: Arc<dyn CarrierClientFactory>,
        policy: ConferencePolicy,
    ) -> Self {
        Self {
            backend,
            carriers,
            policy,
        }
    }

    /// Handle one conference status callback.
    ///
    /// Errors are returned only when the event could not be acted upon
    /// (missing credentials, carrier or backend failure).
    pub async fn handle(&self, context: &ConferenceContext, fields: &CallbackFields) -> Result<()> {
        let event = ConferenceEvent::from_str(fields.get("StatusCallbackEvent").unwrap_or_default());
        counter!("callbridge_conference_events_total", "event" => event.as_str().to_string())
            .increment(1);
        debug!(event = event.as_str(), ?context, "Conference status callback");

        if !event.requires_carrier() {
            match event {
                ConferenceEvent::Start => {
                    info!(
                        conference_sid = fields.get("ConferenceSid").unwrap_or_default(),
                        main_call_sid = context.main_call_sid.as_deref().unwrap_or_default(),
                        "Conference started"
                    );
                }
                ConferenceEvent::ParticipantJoin => self.participant_joined(context, fields).await,
                other => debug!(event = other.as_str(), "Ignoring conference event"),
            }
            return Ok(());
        }

        let conference_sid = fields
            .get("ConferenceSid")
            .ok_or_else(|| DomainError::ValidationError("ConferenceSid is required".to_string()))?;
        let carrier = self.carrier_for(context).await?;

        match event {
            ConferenceEvent::ParticipantLeave => {
                let action = self.participant_left(carrier.as_ref(), conference_sid).await?;
                info!(conference_sid, ?action, "Participant left conference");
            }
            _ => {
                let summary = self
                    .conference_ended(carrier.as_ref(), context, fields)
                    .await?;
                info!(
                    conference_sid,
                    participants = summary.participants.len(),
                    overall_duration = summary.overall_duration,
                    "Conference ended"
                );
            }
        }

        Ok(())
    }

    /// Forward the join event; failures are logged only
    async fn participant_joined(&self, context: &ConferenceContext, fields: &CallbackFields) {
        let event = fields.with("mainCallSid", context.main_call_sid.as_deref());
        if let Err(e) = self.backend.log_conference_participant(&event).await {
            error!(error = %e, "Failed to log conference participant");
        }
    }

    /// Re-check the conference and end it once too few participants remain
    pub async fn participant_left(
        &self,
        carrier: &dyn CarrierClient,
        conference_sid: &str,
    ) -> Result<LeaveAction> {
        let conference = match carrier.fetch_conference(conference_sid).await {
            Ok(conference) => conference,
            Err(e) if e.is_not_found() => {
                warn!(conference_sid, "Conference no longer exists at the carrier");
                return Ok(LeaveAction::AlreadyCompleted);
            }
            Err(e) => return Err(e),
        };
        if conference.is_completed() {
            return Ok(LeaveAction::AlreadyCompleted);
        }

        let remaining = match carrier.list_participants(conference_sid).await {
            Ok(participants) => participants.len(),
            Err(e) if e.is_not_found() => {
                warn!(conference_sid, "Conference gone while listing participants");
                return Ok(LeaveAction::AlreadyCompleted);
            }
            Err(e) => return Err(e),
        };

        if remaining == 0 {
            return Ok(LeaveAction::Emptied);
        }
        if remaining > self.policy.teardown_remaining_participants {
            return Ok(LeaveAction::Continued(remaining));
        }

        match carrier.complete_conference(conference_sid).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(conference_sid, "Conference ended before teardown");
                return Ok(LeaveAction::AlreadyCompleted);
            }
            Err(e) => return Err(e),
        }
        counter!("callbridge_conference_teardowns_total").increment(1);
        info!(conference_sid, remaining, "Conference force-ended");

        Ok(LeaveAction::Terminated)
    }

    /// Reconcile the participant legs and submit the conference summary
    pub async fn conference_ended(
        &self,
        carrier: &dyn CarrierClient,
        context: &ConferenceContext,
        fields: &CallbackFields,
    ) -> Result<ConferenceSummary> {
        let conference_sid = fields.get_or_default("ConferenceSid");

        let conference = match carrier.fetch_conference(&conference_sid).await {
            Ok(conference) => Some(conference),
            Err(e) => {
                warn!(%conference_sid, error = %e, "Conference detail unavailable");
                None
            }
        };

        let event = fields.with("mainCallSid", context.main_call_sid.as_deref());
        let mut party = self.backend.conference_party(&event).await?;
        let mut seen = std::collections::HashSet::new();
        party.retain(|sid| !sid.trim().is_empty() && seen.insert(sid.clone()));

        let mut participants = Vec::with_capacity(party.len());
        for call_sid in &party {
            match carrier.fetch_call(call_sid).await {
                Ok(call) => participants.push(ParticipantLeg::from(call)),
                Err(e) => warn!(%call_sid, error = %e, "Skipping participant leg"),
            }
        }

        let friendly_name = fields
            .get("FriendlyName")
            .map(str::to_string)
            .or_else(|| context.conference_name.clone())
            .or_else(|| conference.as_ref().map(|c| c.friendly_name.clone()))
            .unwrap_or_default();
        let summary = ConferenceSummary::assemble(
            context.main_call_sid.clone(),
            conference_sid,
            friendly_name,
            conference.as_ref(),
            participants,
        );

        self.backend.log_conference_end(&summary).await?;
        Ok(summary)
    }

    async fn carrier_for(&self, context: &ConferenceContext) -> Result<Arc<dyn CarrierClient>> {
        let tenant_id = context
            .tenant_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DomainError::MissingCredentials("companyid is required".to_string()))?;
        let credentials = self
            .backend
            .credentials_for_tenant(tenant_id)
            .await?
            .into_credentials()?;
        Ok(self.carriers.client(&credentials))
    }
}
