//! Configuration management
//!
//! Values come from an optional `callbridge.toml` (path overridable with
//! `CALLBRIDGE_CONFIG`), then from `CALLBRIDGE__<SECTION>__<KEY>` environment
//! variables. Every section has defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "CALLBRIDGE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "callbridge.toml";
pub const ENV_PREFIX: &str = "CALLBRIDGE";

/// Shortest accepted active-call report interval
pub const MIN_REPORT_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub public: PublicConfig,
    pub carrier: CarrierConfig,
    pub backend: BackendConfig,
    pub ai: AiConfig,
    pub conference: ConferenceConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Externally reachable address of this service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

/// System of record (ERP) connection
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Method endpoint prefix, e.g. `https://erp.example.com/api/method/`
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub request_timeout_secs: u64,
    /// When false, free-form audit entries are not sent
    pub audit_log_enabled: bool,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Receives the provider's `call.ended` webhook. Defaults to this
    /// service's own `/whook/callend` when a webhook secret is set.
    pub call_ended_webhook_url: Option<String>,
    /// Key the provider signs its webhooks with
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConferenceConfig {
    pub teardown_remaining_participants: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub report_interval_secs: u64,
    pub direction: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.twilio.com/2010-04-01".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/method/".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            request_timeout_secs: 15,
            audit_log_enabled: true,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("audit_log_enabled", &self.audit_log_enabled)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.ultravox.ai/api".to_string(),
            request_timeout_secs: 30,
            call_ended_webhook_url: None,
            webhook_secret: None,
        }
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("call_ended_webhook_url", &self.call_ended_webhook_url)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for ConferenceConfig {
    fn default() -> Self {
        Self {
            teardown_remaining_participants: 1,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
            direction: "INBOUND".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

impl Config {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config.validated())
    }

    /// Clamp values that would otherwise misbehave at runtime
    pub fn validated(mut self) -> Self {
        if self.telemetry.report_interval_secs < MIN_REPORT_INTERVAL_SECS {
            warn!(
                configured = self.telemetry.report_interval_secs,
                "telemetry.report_interval_secs too small, using {}s",
                MIN_REPORT_INTERVAL_SECS
            );
            self.telemetry.report_interval_secs = MIN_REPORT_INTERVAL_SECS;
        }
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
