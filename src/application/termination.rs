//! Agent-initiated call termination

use crate::domain::carrier::{CallUpdate, CarrierClientFactory};
use crate::domain::hangup::{HangupOutcome, HangupRequest};
use crate::domain::session::ActiveCallRegistry;
use crate::domain::system_of_record::{CallEndedLog, SystemOfRecord};
use crate::domain::Result;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Ends a live call on behalf of the AI agent.
///
/// The registry entry is left in place; it goes away when the carrier
/// reports the leg as terminal.
pub struct CallTerminationHandler {
    registry: Arc<dyn ActiveCallRegistry>,
    backend: Arc<dyn SystemOfRecord>,
    carriers: Arc<dyn CarrierClientFactory>,
}

impl CallTerminationHandler {
    pub fn new(
        registry: Arc<dyn ActiveCallRegistry>,
        backend: Arc<dyn SystemOfRecord>,
        carriers: Arc<dyn CarrierClientFactory>,
    ) -> Self {
        Self {
            registry,
            backend,
            carriers,
        }
    }

    pub async fn hangup(&self, request: &HangupRequest) -> HangupOutcome {
        let carrier_call_id = self
            .registry
            .get(&request.ai_call_id)
            .await
            .and_then(|session| session.carrier_call_id().map(str::to_string));

        let outcome = match carrier_call_id {
            None => {
                warn!(ai_call_id = %request.ai_call_id, "Hangup requested for unknown call");
                HangupOutcome::CallNotFound
            }
            Some(call_sid) => match self.end_call(request, &call_sid).await {
                Ok(()) => {
                    info!(ai_call_id = %request.ai_call_id, %call_sid, "Call ended by agent");
                    HangupOutcome::Completed
                }
                Err(e) => {
                    error!(ai_call_id = %request.ai_call_id, error = %e, "Error ending call");
                    HangupOutcome::Failed(e.to_string())
                }
            },
        };

        counter!("callbridge_hangups_total", "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn end_call(&self, request: &HangupRequest, call_sid: &str) -> Result<()> {
        let credentials = self
            .backend
            .credentials_for_number(&request.to_number)
            .await?
            .into_credentials()?;

        self.carriers
            .client(&credentials)
            .update_call(call_sid, CallUpdate::Complete)
            .await?;

        self.backend
            .log_call_ended(&CallEndedLog::by_agent(request))
            .await
    }
}
