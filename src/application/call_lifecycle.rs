//! Inbound session start and terminal carrier status
//!
//! A `CallSession` is created when the AI session for an inbound call is up
//! and removed when the carrier reports the original leg as finished. No
//! other code path writes to the registry.

use crate::application::callback_urls::CallbackUrls;
use crate::domain::ai_session::AiSessionProvider;
use crate::domain::control_document::VoiceResponse;
use crate::domain::session::{ActiveCallRegistry, CallDirection, CallSession, SessionStatus};
use crate::domain::system_of_record::{AuditEntry, SystemOfRecord};
use crate::domain::{CallbackFields, DomainError, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Name of the media stream bridged to the AI session
pub const STREAM_NAME: &str = "ultravox";

const CONNECT_FAILED: &str = "Sorry, there was an error connecting your call.";

/// Carrier call statuses after which the leg is gone
pub const TERMINAL_CALL_STATUSES: [&str; 5] = ["completed", "busy", "failed", "no-answer", "canceled"];

pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_CALL_STATUSES.contains(&status)
}

/// What a terminal status callback did to the registry
#[derive(Debug, Clone, PartialEq)]
pub enum CallStatusUpdate {
    /// The session was removed; carries the final state
    Removed(CallSession),
    /// Terminal status for a leg the registry does not know
    Unknown,
    /// Status is not terminal
    InProgress,
}

pub struct CallLifecycleService {
    registry: Arc<dyn ActiveCallRegistry>,
    backend: Arc<dyn SystemOfRecord>,
    ai: Arc<dyn AiSessionProvider>,
    urls: CallbackUrls,
}

impl CallLifecycleService {
    pub fn new(
        registry: Arc<dyn ActiveCallRegistry>,
        backend: Arc<dyn SystemOfRecord>,
        ai: Arc<dyn AiSessionProvider>,
        urls: CallbackUrls,
    ) -> Self {
        Self {
            registry,
            backend,
            ai,
            urls,
        }
    }

    /// Answer a new inbound call with a control document.
    ///
    /// Always yields a document; failures turn into a spoken apology.
    pub async fn incoming(&self, fields: &CallbackFields) -> String {
        match self.start_session(fields).await {
            Ok(document) => document.to_xml(),
            Err(e) => {
                error!(error = %e, "Error handling incoming call");
                let entry = AuditEntry::new(
                    "Unhandled error in /incoming",
                    serde_json::to_value(fields).unwrap_or_default(),
                    e.to_string(),
                );
                if let Err(log_err) = self.backend.audit_log(&entry).await {
                    warn!(error = %log_err, "Failed to log incoming call error");
                }
                VoiceResponse::new().say(CONNECT_FAILED).to_xml()
            }
        }
    }

    async fn start_session(&self, fields: &CallbackFields) -> Result<VoiceResponse> {
        let call_sid = fields
            .get("CallSid")
            .ok_or_else(|| DomainError::ValidationError("CallSid is required".to_string()))?;
        let called = fields
            .get("Called")
            .or_else(|| fields.get("To"))
            .ok_or_else(|| DomainError::ValidationError("Called is required".to_string()))?;

        let Some(bundle) = self.backend.voice_session(called).await? else {
            info!(%called, "No voice session configured for number");
            return Ok(VoiceResponse::new());
        };

        let session = self
            .ai
            .create_session(&bundle.ai_api_key, &bundle.call_config)
            .await?;
        if session.call_id.is_empty() || session.join_url.is_empty() {
            return Err(DomainError::AiProvider(
                "AI session not created or missing joinUrl".to_string(),
            ));
        }

        self.registry
            .put(CallSession::new(&session.call_id, call_sid, CallDirection::Inbound))
            .await;
        info!(ai_call_id = %session.call_id, %call_sid, "Inbound call connected to AI session");

        Ok(VoiceResponse::new().connect_stream(
            self.urls.call_status(&session.call_id),
            session.join_url,
            STREAM_NAME,
        ))
    }

    /// Apply a carrier status callback for an original call leg
    pub async fn call_status(
        &self,
        ai_call_id: Option<&str>,
        fields: &CallbackFields,
    ) -> Result<CallStatusUpdate> {
        let (Some(call_sid), Some(status)) = (fields.get("CallSid"), fields.get("CallStatus")) else {
            return Err(DomainError::ValidationError(
                "Missing CallSid or CallStatus".to_string(),
            ));
        };
        info!(%call_sid, %status, "Carrier call status");

        if !is_terminal_status(status) {
            return Ok(CallStatusUpdate::InProgress);
        }

        let session = match self.registry.find_by_carrier_call_id(call_sid).await {
            Some(session) => Some(session),
            None => match ai_call_id {
                Some(id) => self
                    .registry
                    .get(id)
                    .await
                    .filter(|s| s.carrier_call_id() == Some(call_sid)),
                None => None,
            },
        };
        let Some(session) = session else {
            warn!(%call_sid, "No matching active call found");
            return Ok(CallStatusUpdate::Unknown);
        };

        match self.registry.delete(&session.ai_call_id).await {
            Some(mut removed) => {
                removed.status = SessionStatus::Completed;
                info!(ai_call_id = %removed.ai_call_id, %status, "Call removed from registry");
                Ok(CallStatusUpdate::Removed(removed))
            }
            // lost a race with a duplicate delivery
            None => Ok(CallStatusUpdate::Unknown),
        }
    }

    pub async fn active_calls(&self) -> usize {
        self.registry.size().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai_session::{AiSession, MockAiSessionProvider};
    use crate::domain::session::MockActiveCallRegistry;
    use crate::domain::system_of_record::{MockSystemOfRecord, VoiceSessionBundle};

    fn service(
        registry: MockActiveCallRegistry,
        backend: MockSystemOfRecord,
        ai: MockAiSessionProvider,
    ) -> CallLifecycleService {
        CallLifecycleService::new(
            Arc::new(registry),
            Arc::new(backend),
            Arc::new(ai),
            CallbackUrls::new("https://bridge.example.com"),
        )
    }

    fn inbound_fields() -> CallbackFields {
        [("CallSid", "T1"), ("Called", "+1900"), ("From", "+1800")]
            .into_iter()
            .collect()
    }

    fn bundle_backend() -> MockSystemOfRecord {
        let mut backend = MockSystemOfRecord::new();
        backend
            .expect_voice_session()
            .withf(|number| number == "+1900")
            .returning(|_| {
                Ok(Some(VoiceSessionBundle {
                    ai_api_key: "uv-key".to_string(),
                    call_config: serde_json::json!({"systemPrompt": "hi"}),
                }))
            });
        backend
    }

    #[tokio::test]
    async fn test_incoming_registers_session_and_connects_stream() {
        let mut ai = MockAiSessionProvider::new();
        ai.expect_create_session()
            .withf(|key, config| key == "uv-key" && config["systemPrompt"] == "hi")
            .times(1)
            .returning(|_, _| {
                Ok(AiSession {
                    call_id: "C1".to_string(),
                    join_url: "wss://voice.example.com/C1".to_string(),
                })
            });

        let mut registry = MockActiveCallRegistry::new();
        registry
            .expect_put()
            .withf(|session| {
                session.ai_call_id == "C1"
                    && session.carrier_call_id == "T1"
                    && session.direction == CallDirection::Inbound
            })
            .times(1)
            .returning(|_| ());

        let xml = service(registry, bundle_backend(), ai)
            .incoming(&inbound_fields())
            .await;

        assert!(xml.contains(
            r#"<Connect action="https://bridge.example.com/twilio/callStatus?callId=C1" method="POST">"#
        ));
        assert!(xml.contains(r#"<Stream url="wss://voice.example.com/C1" name="ultravox"/>"#));
    }

    #[tokio::test]
    async fn test_incoming_without_bundle_answers_empty() {
        let mut backend = MockSystemOfRecord::new();
        backend.expect_voice_session().returning(|_| Ok(None));
        let mut registry = MockActiveCallRegistry::new();
        registry.expect_put().times(0);
        let mut ai = MockAiSessionProvider::new();
        ai.expect_create_session().times(0);

        let xml = service(registry, backend, ai).incoming(&inbound_fields()).await;
        assert!(xml.ends_with("<Response></Response>"));
    }

    #[tokio::test]
    async fn test_incoming_failure_apologizes_and_audits() {
        let mut backend = bundle_backend();
        backend.expect_audit_log().times(1).returning(|_| Ok(()));
        let mut ai = MockAiSessionProvider::new();
        ai.expect_create_session()
            .returning(|_, _| Err(DomainError::AiProvider("401".to_string())));
        let mut registry = MockActiveCallRegistry::new();
        registry.expect_put().times(0);

        let xml = service(registry, backend, ai).incoming(&inbound_fields()).await;
        assert!(xml.contains("<Say>Sorry, there was an error connecting your call.</Say>"));
    }

    #[tokio::test]
    async fn test_completed_status_removes_session() {
        let mut registry = MockActiveCallRegistry::new();
        registry
            .expect_find_by_carrier_call_id()
            .withf(|sid| sid == "T1")
            .returning(|_| Some(CallSession::new("C1", "T1", CallDirection::Inbound)));
        registry
            .expect_delete()
            .withf(|id| id == "C1")
            .times(1)
            .returning(|_| Some(CallSession::new("C1", "T1", CallDirection::Inbound)));

        let fields: CallbackFields = [("CallSid", "T1"), ("CallStatus", "completed")]
            .into_iter()
            .collect();
        let update = service(registry, MockSystemOfRecord::new(), MockAiSessionProvider::new())
            .call_status(Some("C1"), &fields)
            .await
            .unwrap();

        match update {
            CallStatusUpdate::Removed(session) => {
                assert_eq!(session.status, SessionStatus::Completed)
            }
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_leg_is_tolerated() {
        let mut registry = MockActiveCallRegistry::new();
        registry.expect_find_by_carrier_call_id().returning(|_| None);
        registry.expect_get().returning(|_| None);
        registry.expect_delete().times(0);

        let fields: CallbackFields = [("CallSid", "T9"), ("CallStatus", "completed")]
            .into_iter()
            .collect();
        let update = service(registry, MockSystemOfRecord::new(), MockAiSessionProvider::new())
            .call_status(Some("C9"), &fields)
            .await
            .unwrap();

        assert_eq!(update, CallStatusUpdate::Unknown);
    }

    #[tokio::test]
    async fn test_non_terminal_status_keeps_session() {
        let mut registry = MockActiveCallRegistry::new();
        registry.expect_delete().times(0);

        let fields: CallbackFields = [("CallSid", "T1"), ("CallStatus", "in-progress")]
            .into_iter()
            .collect();
        let update = service(registry, MockSystemOfRecord::new(), MockAiSessionProvider::new())
            .call_status(None, &fields)
            .await
            .unwrap();

        assert_eq!(update, CallStatusUpdate::InProgress);
    }

    #[tokio::test]
    async fn test_missing_status_fields_rejected() {
        let fields: CallbackFields = [("CallSid", "T1")].into_iter().collect();
        let result = service(
            MockActiveCallRegistry::new(),
            MockSystemOfRecord::new(),
            MockAiSessionProvider::new(),
        )
        .call_status(None, &fields)
        .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
