//! Recording and per-leg transfer status reconciliation

use crate::domain::conference::ConferenceContext;
use crate::domain::recording::RecordingRecord;
use crate::domain::system_of_record::SystemOfRecord;
use crate::domain::{CallbackFields, Result};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CallbackReconciler {
    backend: Arc<dyn SystemOfRecord>,
}

impl CallbackReconciler {
    pub fn new(backend: Arc<dyn SystemOfRecord>) -> Self {
        Self { backend }
    }

    /// Forward a completed recording. Returns the stored record, or `None`
    /// when the callback is not actionable.
    pub async fn recording_status(
        &self,
        context: &ConferenceContext,
        fields: &CallbackFields,
    ) -> Result<Option<RecordingRecord>> {
        let record = RecordingRecord::from_callback(
            fields,
            context.main_call_sid.as_deref(),
            context.conference_name.as_deref(),
            context.tenant_id.as_deref(),
        );

        let Some(record) = record else {
            let status = fields.get("RecordingStatus").unwrap_or("missing");
            info!(status, "Recording not completed or URL missing");
            counter!("callbridge_recordings_total", "status" => "ignored").increment(1);
            return Ok(None);
        };

        debug!(recording_url = %record.recording_url, kind = ?record.recording_type, "Recording completed");
        self.backend.log_recording(&record).await?;
        counter!("callbridge_recordings_total", "status" => "completed").increment(1);

        Ok(Some(record))
    }

    /// Forward a per-leg status callback of the agent leg. Every delivery is
    /// forwarded, incomplete ones included.
    pub async fn transfer_status(
        &self,
        main_call_sid: Option<&str>,
        fields: &CallbackFields,
    ) -> Result<()> {
        if fields.get("CallSid").is_none() {
            warn!(?main_call_sid, "Transfer status callback without CallSid");
        }

        debug!(
            call_sid = fields.get("CallSid").unwrap_or_default(),
            call_status = fields.get("CallStatus").unwrap_or_default(),
            "Transfer leg status"
        );
        self.backend
            .log_transfer_status(&fields.with("mainCallSid", main_call_sid))
            .await
    }
}
