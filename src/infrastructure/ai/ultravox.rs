//! Ultravox session client

use crate::domain::ai_session::{AiSession, AiSessionProvider};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

pub struct UltravoxClient {
    http: reqwest::Client,
    base_url: String,
    call_ended_webhook_url: Option<String>,
}

impl UltravoxClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        call_ended_webhook_url: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            call_ended_webhook_url,
        })
    }

    /// Provider config with the `call.ended` webhook attached
    fn session_config(&self, config: &Value) -> Value {
        let mut config = match config {
            Value::Object(_) => config.clone(),
            _ => json!({}),
        };
        if let (Some(url), Some(object)) = (&self.call_ended_webhook_url, config.as_object_mut()) {
            object.insert(
                "experimentalSettings".to_string(),
                json!({ "webhooks": [{ "url": url, "events": ["call.ended"] }] }),
            );
        }
        config
    }
}

#[async_trait]
impl AiSessionProvider for UltravoxClient {
    async fn create_session(&self, api_key: &str, config: &Value) -> Result<AiSession> {
        let url = format!("{}/calls", self.base_url);
        debug!(%url, "Creating AI session");

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", api_key)
            .json(&self.session_config(config))
            .send()
            .await
            .map_err(|e| DomainError::AiProvider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "AI provider rejected session");
            return Err(DomainError::AiProvider(format!("provider returned {status}")));
        }

        response
            .json::<AiSession>()
            .await
            .map_err(|e| DomainError::AiProvider(format!("invalid session response: {e}")))
    }
}
