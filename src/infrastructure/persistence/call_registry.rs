//! In-memory implementation of the active-call registry

use crate::domain::session::{ActiveCallRegistry, CallSession};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Entries {
    sessions: HashMap<String, CallSession>,
    /// carrier call id -> AI call id
    by_carrier_call: HashMap<String, String>,
}

/// Process-local registry with a secondary index on the carrier call id.
///
/// Both maps sit behind one lock so the index never points at a missing
/// session.
#[derive(Clone, Default)]
pub struct InMemoryCallRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl InMemoryCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActiveCallRegistry for InMemoryCallRegistry {
    async fn put(&self, session: CallSession) {
        let mut entries = self.entries.write().await;

        if let Some(previous) = entries.sessions.remove(&session.ai_call_id) {
            if let Some(sid) = previous.carrier_call_id() {
                entries.by_carrier_call.remove(sid);
            }
        }
        if let Some(sid) = session.carrier_call_id() {
            // a carrier leg belongs to one session; evict the stale owner
            if let Some(owner) = entries.by_carrier_call.insert(sid.to_string(), session.ai_call_id.clone()) {
                if owner != session.ai_call_id {
                    entries.sessions.remove(&owner);
                }
            }
        }

        debug!(ai_call_id = %session.ai_call_id, "Registered call session");
        entries.sessions.insert(session.ai_call_id.clone(), session);
    }

    async fn get(&self, ai_call_id: &str) -> Option<CallSession> {
        self.entries.read().await.sessions.get(ai_call_id).cloned()
    }

    async fn delete(&self, ai_call_id: &str) -> Option<CallSession> {
        let mut entries = self.entries.write().await;
        let removed = entries.sessions.remove(ai_call_id)?;
        if let Some(sid) = removed.carrier_call_id() {
            entries.by_carrier_call.remove(sid);
        }
        debug!(%ai_call_id, "Removed call session");
        Some(removed)
    }

    async fn find_by_carrier_call_id(&self, carrier_call_id: &str) -> Option<CallSession> {
        let entries = self.entries.read().await;
        let ai_call_id = entries.by_carrier_call.get(carrier_call_id)?;
        entries.sessions.get(ai_call_id).cloned()
    }

    async fn size(&self) -> usize {
        self.entries.read().await.sessions.len()
    }
}
