//! End-of-call events from the AI provider
//!
//! The provider retries deliveries, so the same `call.ended` event can
//! arrive more than once. The system of record is asked first and a stored
//! session short-circuits the write.

use crate::domain::ai_event::{AiEvent, AiEventOutcome};
use crate::domain::system_of_record::{AuditEntry, SystemOfRecord};
use crate::domain::Result;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct AiEventHandler {
    backend: Arc<dyn SystemOfRecord>,
}

impl AiEventHandler {
    pub fn new(backend: Arc<dyn SystemOfRecord>) -> Self {
        Self { backend }
    }

    pub async fn handle(&self, event: &AiEvent) -> AiEventOutcome {
        let outcome = self.dispatch(event).await;
        counter!("callbridge_ai_events_total", "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn dispatch(&self, event: &AiEvent) -> AiEventOutcome {
        if !event.is_call_ended() {
            debug!(event = ?event.event_type(), "Ignoring AI provider event");
            return AiEventOutcome::Ignored;
        }
        let Some(ai_call_id) = event.ai_call_id() else {
            warn!("call.ended event without callId");
            return AiEventOutcome::Ignored;
        };

        match self.call_ended(event, ai_call_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%ai_call_id, error = %e, "Failed to log call session");
                let entry = AuditEntry::new(
                    "Error logging call session",
                    event.body().clone(),
                    e.to_string(),
                );
                if let Err(audit_err) = self.backend.audit_log(&entry).await {
                    warn!(error = %audit_err, "Failed to write audit entry");
                }
                AiEventOutcome::Failed(e.to_string())
            }
        }
    }

    async fn call_ended(&self, event: &AiEvent, ai_call_id: &str) -> Result<AiEventOutcome> {
        if let Some(docname) = self
            .backend
            .handled_call_session(ai_call_id, event.tenant_id())
            .await?
        {
            info!(%ai_call_id, %docname, "Call session already handled");
            return Ok(AiEventOutcome::AlreadyHandled(docname));
        }

        self.backend.log_call_session(event.body()).await?;
        info!(%ai_call_id, tenant_id = ?event.tenant_id(), "Call session logged");
        Ok(AiEventOutcome::Logged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::system_of_record::MockSystemOfRecord;
    use crate::domain::DomainError;

    fn call_ended() -> AiEvent {
        AiEvent::new(serde_json::json!({
            "event": "call.ended",
            "call": {"callId": "uv-1", "metadata": {"COMPANYID": "ACME"}}
        }))
    }

    #[tokio::test]
    async fn test_new_session_is_logged() {
        let mut backend = MockSystemOfRecord::new();
        backend
            .expect_handled_call_session()
            .withf(|ai_call_id, tenant_id| ai_call_id == "uv-1" && *tenant_id == Some("ACME"))
            .times(1)
            .returning(|_, _| Ok(None));
        backend
            .expect_log_call_session()
            .withf(|body| body["call"]["callId"] == "uv-1")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = AiEventHandler::new(Arc::new(backend)).handle(&call_ended()).await;
        assert_eq!(outcome, AiEventOutcome::Logged);
    }

    #[tokio::test]
    async fn test_existing_session_is_not_logged_again() {
        let mut backend = MockSystemOfRecord::new();
        backend
            .expect_handled_call_session()
            .returning(|_, _| Ok(Some("CSL-0007".to_string())));
        backend.expect_log_call_session().times(0);

        let outcome = AiEventHandler::new(Arc::new(backend)).handle(&call_ended()).await;
        assert_eq!(outcome, AiEventOutcome::AlreadyHandled("CSL-0007".to_string()));
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let mut backend = MockSystemOfRecord::new();
        backend.expect_handled_call_session().times(0);
        backend.expect_log_call_session().times(0);
        let handler = AiEventHandler::new(Arc::new(backend));

        let started = AiEvent::new(serde_json::json!({"event": "call.started", "call": {"callId": "uv-1"}}));
        assert_eq!(handler.handle(&started).await, AiEventOutcome::Ignored);

        let anonymous = AiEvent::new(serde_json::json!({"event": "call.ended", "call": {}}));
        assert_eq!(handler.handle(&anonymous).await, AiEventOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_backend_failure_is_audited() {
        let mut backend = MockSystemOfRecord::new();
        backend
            .expect_handled_call_session()
            .returning(|_, _| Err(DomainError::Backend("timeout".to_string())));
        backend
            .expect_audit_log()
            .withf(|entry| entry.error_text == "Error logging call session")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = AiEventHandler::new(Arc::new(backend)).handle(&call_ended()).await;
        assert!(matches!(outcome, AiEventOutcome::Failed(message) if message.contains("timeout")));
    }
}
