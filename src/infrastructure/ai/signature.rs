//! Provider webhook signatures
//!
//! Each delivery carries `X-Ultravox-Webhook-Timestamp` and a comma-separated
//! `X-Ultravox-Webhook-Signature` list (several while a key rotates). A
//! signature is hex HMAC-SHA256 over the raw body followed by the timestamp.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-ultravox-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-ultravox-webhook-timestamp";

/// Accepted clock skew, in seconds
pub const MAX_SKEW_SECS: i64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Forbidden: Missing signature")]
    Missing,

    #[error("Forbidden: Invalid timestamp")]
    InvalidTimestamp,

    #[error("Forbidden: Expired timestamp")]
    ExpiredTimestamp,

    #[error("Forbidden: Invalid signature")]
    Invalid,
}

#[derive(Clone, Default)]
pub struct WebhookVerifier {
    secret: Option<String>,
}

impl WebhookVerifier {
    /// Without a secret every delivery is rejected
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn verify(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signatures: Option<&str>,
    ) -> Result<(), SignatureError> {
        self.verify_at(body, timestamp, signatures, Utc::now())
    }

    pub fn verify_at(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signatures: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let (Some(secret), Some(signatures)) = (self.secret.as_deref(), signatures) else {
            return Err(SignatureError::Missing);
        };
        let timestamp = timestamp.unwrap_or_default();

        let sent_at = DateTime::parse_from_rfc3339(timestamp.trim())
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if (now - sent_at.with_timezone(&Utc)).num_seconds().abs() > MAX_SKEW_SECS {
            return Err(SignatureError::ExpiredTimestamp);
        }

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Invalid)?;
        mac.update(body);
        mac.update(timestamp.as_bytes());

        let valid = signatures
            .split(',')
            .filter_map(|s| hex::decode(s.trim()).ok())
            .any(|expected| mac.clone().verify_slice(&expected).is_ok());
        if valid {
            Ok(())
        } else {
            Err(SignatureError::Invalid)
        }
    }

    /// Signature header value for `body` sent at `timestamp`
    pub fn sign(&self, body: &[u8], timestamp: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_deref()?.as_bytes()).ok()?;
        mac.update(body);
        mac.update(timestamp.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}
