//! Conversational-AI session port

use super::shared::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A created AI session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSession {
    pub call_id: String,
    pub join_url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiSessionProvider: Send + Sync {
    /// Create a session from an opaque provider config
    async fn create_session(&self, api_key: &str, config: &serde_json::Value) -> Result<AiSession>;
}
