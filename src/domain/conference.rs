//! Transfer conference model
//!
//! Nothing here is persisted. A conference is identified by correlation keys
//! carried in every callback URL plus whatever the carrier and the system of
//! record report at the time an event is handled.

use super::carrier::{CallResource, ConferenceResource};
use serde::{Deserialize, Serialize};

/// Lifecycle event reported by the carrier for a conference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConferenceEvent {
    Start,
    ParticipantJoin,
    ParticipantLeave,
    End,
    Other(String),
}

impl ConferenceEvent {
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "conference-start" => ConferenceEvent::Start,
            "participant-join" => ConferenceEvent::ParticipantJoin,
            "participant-leave" => ConferenceEvent::ParticipantLeave,
            "conference-end" => ConferenceEvent::End,
            other => ConferenceEvent::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConferenceEvent::Start => "conference-start",
            ConferenceEvent::ParticipantJoin => "participant-join",
            ConferenceEvent::ParticipantLeave => "participant-leave",
            ConferenceEvent::End => "conference-end",
            ConferenceEvent::Other(other) => other.as_str(),
        }
    }

    /// Events that need an authenticated carrier client
    pub fn requires_carrier(&self) -> bool {
        matches!(
            self,
            ConferenceEvent::ParticipantLeave | ConferenceEvent::End
        )
    }
}

/// Correlation keys threaded through the conference callback URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceContext {
    #[serde(rename = "mainCallSid", default)]
    pub main_call_sid: Option<String>,
    #[serde(rename = "conferenceName", default)]
    pub conference_name: Option<String>,
    #[serde(rename = "companyid", default)]
    pub tenant_id: Option<String>,
}

/// Teardown policy applied when a participant leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConferencePolicy {
    /// Remaining participant count at which the conference is force-ended
    pub teardown_remaining_participants: usize,
}

impl Default for ConferencePolicy {
    fn default() -> Self {
        // caller + agent: once one of them is gone the other must not be left alone
        Self {
            teardown_remaining_participants: 1,
        }
    }
}

/// What the tracker did in response to a participant leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    /// The carrier had already completed the conference
    AlreadyCompleted,
    /// The conference was force-ended
    Terminated,
    /// Nobody left; the carrier is about to end the conference itself
    Emptied,
    /// Enough participants remain for the conference to continue
    Continued(usize),
}

/// One call leg that took part in the conference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeg {
    pub call_sid: String,
    pub from: String,
    pub to: String,
    pub status: String,
    pub duration: f64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<CallResource> for ParticipantLeg {
    fn from(call: CallResource) -> Self {
        let duration = call.duration_secs();
        ParticipantLeg {
            call_sid: call.sid,
            from: call.from,
            to: call.to,
            status: call.status,
            duration,
            start_time: call.start_time,
            end_time: call.end_time,
        }
    }
}

/// Consolidated record submitted once a conference has ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceSummary {
    pub main_call_sid: Option<String>,
    pub conference_sid: String,
    #[serde(rename = "conference_friendly_name")]
    pub friendly_name: String,
    pub overall_duration: f64,
    #[serde(rename = "totalDurationP")]
    pub total_leg_duration: f64,
    pub end_reason: String,
    pub participants: Vec<ParticipantLeg>,
}

impl ConferenceSummary {
    /// Assemble the summary. A missing conference record leaves the overall
    /// duration at zero and the end reason "unknown".
    pub fn assemble(
        main_call_sid: Option<String>,
        conference_sid: String,
        friendly_name: String,
        conference: Option<&ConferenceResource>,
        participants: Vec<ParticipantLeg>,
    ) -> Self {
        let overall_duration = conference
            .map(|c| c.overall_duration_secs())
            .unwrap_or(0.0);
        let end_reason = conference
            .and_then(|c| c.reason_conference_ended.clone())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let total_leg_duration = participants.iter().map(|p| p.duration).sum();

        Self {
            main_call_sid,
            conference_sid,
            friendly_name,
            overall_duration,
            total_leg_duration,
            end_reason,
            participants,
        }
    }
}
