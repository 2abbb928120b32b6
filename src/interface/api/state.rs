//! Shared handler state

use crate::application::{
    AiEventHandler, CallLifecycleService, CallTerminationHandler, CallbackReconciler, CallbackUrls,
    ConferencePresenceTracker, TransferInitiator,
};
use crate::domain::ai_session::AiSessionProvider;
use crate::domain::carrier::CarrierClientFactory;
use crate::domain::conference::ConferencePolicy;
use crate::domain::session::ActiveCallRegistry;
use crate::domain::system_of_record::SystemOfRecord;
use crate::infrastructure::ai::WebhookVerifier;
use std::sync::Arc;

/// Application state shared by all webhook and tool handlers
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<CallLifecycleService>,
    pub transfers: Arc<TransferInitiator>,
    pub conferences: Arc<ConferencePresenceTracker>,
    pub reconciler: Arc<CallbackReconciler>,
    pub terminations: Arc<CallTerminationHandler>,
    pub ai_events: Arc<AiEventHandler>,
    pub webhook_verifier: WebhookVerifier,
    pub urls: CallbackUrls,
}

impl AppState {
    /// Wire every service against the same set of ports
    pub fn new(
        registry: Arc<dyn ActiveCallRegistry>,
        backend: Arc<dyn SystemOfRecord>,
        carriers: Arc<dyn CarrierClientFactory>,
        ai: Arc<dyn AiSessionProvider>,
        urls: CallbackUrls,
        policy: ConferencePolicy,
    ) -> Self {
        Self {
            lifecycle: Arc::new(CallLifecycleService::new(
                registry.clone(),
                backend.clone(),
                ai,
                urls.clone(),
            )),
            transfers: Arc::new(TransferInitiator::new(
                registry.clone(),
                backend.clone(),
                carriers.clone(),
                urls.clone(),
            )),
            conferences: Arc::new(ConferencePresenceTracker::new(
                backend.clone(),
                carriers.clone(),
                policy,
            )),
            reconciler: Arc::new(CallbackReconciler::new(backend.clone())),
            ai_events: Arc::new(AiEventHandler::new(backend.clone())),
            terminations: Arc::new(CallTerminationHandler::new(registry, backend, carriers)),
            webhook_verifier: WebhookVerifier::default(),
            urls,
        }
    }

    /// Verifier for AI provider webhooks; without one they are all rejected
    pub fn with_webhook_verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.webhook_verifier = verifier;
        self
    }
}
