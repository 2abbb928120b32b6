//! In-process fakes of the bridge's ports plus request helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, Response},
    Router,
};
use callbridge::application::CallbackUrls;
use callbridge::domain::ai_session::{AiSession, AiSessionProvider};
use callbridge::domain::carrier::{
    CallResource, CallUpdate, CarrierClient, CarrierClientFactory, CarrierCredentials,
    ConferenceParticipant, ConferenceResource, OutboundCall,
};
use callbridge::domain::conference::{ConferencePolicy, ConferenceSummary};
use callbridge::domain::recording::RecordingRecord;
use callbridge::domain::session::ActiveCallRegistry;
use callbridge::domain::system_of_record::{
    ActiveCallReport, AuditEntry, CallEndedLog, PhoneCredentials, SystemOfRecord,
    TransferAttemptLog, TransferGrant, VoiceSessionBundle,
};
use callbridge::domain::{CallbackFields, DomainError, Result};
use callbridge::infrastructure::ai::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use callbridge::infrastructure::ai::WebhookVerifier;
use callbridge::infrastructure::persistence::InMemoryCallRegistry;
use callbridge::interface::api::{build_router, detached_handle, AppState};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const BASE_URL: &str = "https://bridge.example.com";
pub const WEBHOOK_SECRET: &str = "whsec-test";

/// System of record that keeps everything it is sent
#[derive(Default)]
pub struct FakeBackend {
    pub voice_session: Option<VoiceSessionBundle>,
    pub credentials: Option<PhoneCredentials>,
    pub party: Vec<String>,
    pub transfer_attempts: Mutex<Vec<TransferAttemptLog>>,
    pub audits: Mutex<Vec<AuditEntry>>,
    pub participants: Mutex<Vec<CallbackFields>>,
    pub conference_ends: Mutex<Vec<ConferenceSummary>>,
    pub calls_ended: Mutex<Vec<CallEndedLog>>,
    pub transfer_statuses: Mutex<Vec<CallbackFields>>,
    pub recordings: Mutex<Vec<RecordingRecord>>,
    pub call_sessions: Mutex<Vec<serde_json::Value>>,
}

impl FakeBackend {
    /// Backend configured for one tenant with a voice agent and credentials
    pub fn configured() -> Self {
        Self {
            voice_session: Some(VoiceSessionBundle {
                ai_api_key: "uv-key".to_string(),
                call_config: serde_json::json!({ "systemPrompt": "be nice" }),
            }),
            credentials: Some(PhoneCredentials::new("AC123", "secret")),
            ..Default::default()
        }
    }

    fn phone_credentials(&self) -> Result<PhoneCredentials> {
        self.credentials
            .clone()
            .ok_or_else(|| DomainError::MissingCredentials("no credentials".to_string()))
    }
}

#[async_trait]
impl SystemOfRecord for FakeBackend {
    async fn log_transfer_attempt(&self, attempt: &TransferAttemptLog) -> Result<TransferGrant> {
        self.transfer_attempts.lock().unwrap().push(attempt.clone());
        Ok(TransferGrant {
            phone_credentials: self.phone_credentials()?,
            recording_enabled: true,
            max_conference_duration: Some(1800),
        })
    }

    async fn credentials_for_tenant(&self, _tenant_id: &str) -> Result<PhoneCredentials> {
        self.phone_credentials()
    }

    async fn credentials_for_number(&self, _phone_number: &str) -> Result<PhoneCredentials> {
        self.phone_credentials()
    }

    async fn audit_log(&self, entry: &AuditEntry) -> Result<()> {
        self.audits.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn log_conference_participant(&self, event: &CallbackFields) -> Result<()> {
        self.participants.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn conference_party(&self, _event: &CallbackFields) -> Result<Vec<String>> {
        Ok(self.party.clone())
    }

    async fn log_conference_end(&self, summary: &ConferenceSummary) -> Result<()> {
        self.conference_ends.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn log_call_ended(&self, record: &CallEndedLog) -> Result<()> {
        self.calls_ended.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn log_transfer_status(&self, event: &CallbackFields) -> Result<()> {
        self.transfer_statuses.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn log_recording(&self, recording: &RecordingRecord) -> Result<()> {
        self.recordings.lock().unwrap().push(recording.clone());
        Ok(())
    }

    async fn voice_session(&self, _called_number: &str) -> Result<Option<VoiceSessionBundle>> {
        Ok(self.voice_session.clone())
    }

    async fn log_active_calls(&self, _report: &ActiveCallReport) -> Result<()> {
        Ok(())
    }

    async fn handled_call_session<'a>(
        &self,
        ai_call_id: &str,
        _tenant_id: Option<&'a str>,
    ) -> Result<Option<String>> {
        let sessions = self.call_sessions.lock().unwrap();
        Ok(sessions
            .iter()
            .position(|event| event["call"]["callId"] == ai_call_id)
            .map(|index| format!("CSL-{:04}", index + 1)))
    }

    async fn log_call_session(&self, event: &serde_json::Value) -> Result<()> {
        self.call_sessions.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Carrier account that records every mutation
#[derive(Default)]
pub struct FakeCarrier {
    pub updates: Mutex<Vec<(String, CallUpdate)>>,
    pub created: Mutex<Vec<OutboundCall>>,
    pub completed_conferences: Mutex<Vec<String>>,
    pub remaining_participants: Mutex<usize>,
}

impl FakeCarrier {
    pub fn with_participants(count: usize) -> Self {
        Self {
            remaining_participants: Mutex::new(count),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CarrierClient for FakeCarrier {
    async fn update_call(&self, call_sid: &str, update: CallUpdate) -> Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((call_sid.to_string(), update));
        Ok(())
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<CallResource> {
        self.created.lock().unwrap().push(call.clone());
        Ok(CallResource {
            sid: "CA-AGENT".to_string(),
            to: call.to.clone(),
            from: call.from.clone(),
            status: "queued".to_string(),
            ..Default::default()
        })
    }

    async fn fetch_call(&self, call_sid: &str) -> Result<CallResource> {
        Ok(CallResource {
            sid: call_sid.to_string(),
            status: "completed".to_string(),
            duration: Some("30".to_string()),
            ..Default::default()
        })
    }

    async fn fetch_conference(&self, conference_sid: &str) -> Result<ConferenceResource> {
        let status = if self.completed_conferences.lock().unwrap().is_empty() {
            "in-progress"
        } else {
            "completed"
        };
        Ok(ConferenceResource {
            sid: conference_sid.to_string(),
            friendly_name: "conference_CA-MAIN".to_string(),
            status: status.to_string(),
            ..Default::default()
        })
    }

    async fn complete_conference(&self, conference_sid: &str) -> Result<()> {
        self.completed_conferences
            .lock()
            .unwrap()
            .push(conference_sid.to_string());
        Ok(())
    }

    async fn list_participants(&self, _conference_sid: &str) -> Result<Vec<ConferenceParticipant>> {
        let count = *self.remaining_participants.lock().unwrap();
        Ok((0..count)
            .map(|i| ConferenceParticipant {
                call_sid: format!("CA-P{}", i),
                status: Some("connected".to_string()),
            })
            .collect())
    }
}

/// Hands out the same carrier account for every credential set
pub struct FakeCarrierFactory(pub Arc<FakeCarrier>);

impl CarrierClientFactory for FakeCarrierFactory {
    fn client(&self, _credentials: &CarrierCredentials) -> Arc<dyn CarrierClient> {
        self.0.clone()
    }
}

/// AI provider that always creates the same session
pub struct FakeAi;

#[async_trait]
impl AiSessionProvider for FakeAi {
    async fn create_session(&self, _api_key: &str, _config: &serde_json::Value) -> Result<AiSession> {
        Ok(AiSession {
            call_id: "uv-1".to_string(),
            join_url: "wss://ai.example.com/join/uv-1".to_string(),
        })
    }
}

pub struct TestBridge {
    pub app: Router,
    pub registry: Arc<InMemoryCallRegistry>,
    pub backend: Arc<FakeBackend>,
    pub carrier: Arc<FakeCarrier>,
}

impl TestBridge {
    pub fn new(backend: FakeBackend, carrier: FakeCarrier) -> Self {
        let registry = Arc::new(InMemoryCallRegistry::new());
        let backend = Arc::new(backend);
        let carrier = Arc::new(carrier);

        let state = AppState::new(
            registry.clone(),
            backend.clone(),
            Arc::new(FakeCarrierFactory(carrier.clone())),
            Arc::new(FakeAi),
            CallbackUrls::new(BASE_URL),
            ConferencePolicy::default(),
        )
        .with_webhook_verifier(verifier());

        Self {
            app: build_router(state, detached_handle()),
            registry,
            backend,
            carrier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, String) {
        let response: Response<Body> = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub async fn active_calls(&self) -> usize {
        self.registry.size().await
    }
}

pub fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn verifier() -> WebhookVerifier {
    WebhookVerifier::new(Some(WEBHOOK_SECRET.to_string()))
}

/// AI provider webhook signed with the test secret
pub fn signed_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = chrono::Utc::now().to_rfc3339();
    let signature = verifier().sign(body.as_bytes(), &timestamp).unwrap();

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
