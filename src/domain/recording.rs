//! Recording and per-leg status callbacks

use super::shared::CallbackFields;
use serde::{Deserialize, Serialize};

/// Whether a recording covers the whole conference or a single call leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingType {
    Conference,
    Call,
}

/// Normalized recording forwarded to the system of record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    pub call_sid: Option<String>,
    pub conference_sid: Option<String>,
    pub recording_sid: Option<String>,
    pub recording_url: String,
    pub status: String,
    pub duration: Option<String>,
    pub channels: Option<String>,
    pub timestamp: Option<String>,
    pub main_call_sid: Option<String>,
    pub conference_name: Option<String>,
    #[serde(rename = "companyid")]
    pub tenant_id: Option<String>,
    pub recording_type: RecordingType,
}

impl RecordingRecord {
    /// Build the record from a recording-status callback.
    ///
    /// Only a completed recording with a URL is actionable; anything else
    /// yields `None`.
    pub fn from_callback(
        fields: &CallbackFields,
        main_call_sid: Option<&str>,
        conference_name: Option<&str>,
        tenant_id: Option<&str>,
    ) -> Option<Self> {
        let url = fields.get("RecordingUrl")?;
        if fields.get("RecordingStatus") != Some("completed") {
            return None;
        }

        let owned = |v: Option<&str>| v.map(str::to_string);
        let conference_sid = owned(fields.get("ConferenceSid"));
        let recording_type = if conference_sid.is_some() {
            RecordingType::Conference
        } else {
            RecordingType::Call
        };

        Some(Self {
            call_sid: owned(fields.get("CallSid")),
            conference_sid,
            recording_sid: owned(fields.get("RecordingSid")),
            recording_url: media_url(url),
            status: "completed".to_string(),
            duration: owned(fields.get("RecordingDuration")),
            channels: owned(fields.get("RecordingChannels")),
            timestamp: owned(fields.get("Timestamp")),
            main_call_sid: owned(main_call_sid),
            conference_name: owned(conference_name),
            tenant_id: owned(tenant_id),
            recording_type,
        })
    }
}

/// Direct download URL of a recording
pub fn media_url(recording_url: &str) -> String {
    if recording_url.ends_with(".mp3") {
        recording_url.to_string()
    } else {
        format!("{}.mp3", recording_url)
    }
}
