//! Active-call registry interface

use super::entity::CallSession;
use async_trait::async_trait;

/// Store of live call sessions keyed by AI call id.
///
/// This is the only shared mutable state in the process. The in-memory
/// adapter is process-local; a multi-instance deployment swaps in an
/// external store behind this same trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActiveCallRegistry: Send + Sync {
    /// Insert or replace the session stored under its AI call id
    async fn put(&self, session: CallSession);

    /// Get a session by AI call id
    async fn get(&self, ai_call_id: &str) -> Option<CallSession>;

    /// Remove a session. Removing an unknown id is a no-op and returns `None`.
    async fn delete(&self, ai_call_id: &str) -> Option<CallSession>;

    /// Find the session that owns a carrier call leg
    async fn find_by_carrier_call_id(&self, carrier_call_id: &str) -> Option<CallSession>;

    /// Number of live sessions
    async fn size(&self) -> usize;
}
