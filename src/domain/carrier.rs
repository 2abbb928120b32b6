//! Carrier call-control port
//!
//! The carrier owns the authoritative state of every call leg and
//! conference. The bridge only issues commands and reads resources back.

use super::shared::{DomainError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-tenant carrier account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct CarrierCredentials {
    account_sid: String,
    auth_token: String,
}

impl CarrierCredentials {
    /// Build credentials, refusing partial input.
    pub fn from_parts(account_sid: Option<&str>, auth_token: Option<&str>) -> Result<Self> {
        let account_sid = account_sid.map(str::trim).filter(|s| !s.is_empty());
        let auth_token = auth_token.map(str::trim).filter(|s| !s.is_empty());

        match (account_sid, auth_token) {
            (Some(sid), Some(token)) => Ok(Self {
                account_sid: sid.to_string(),
                auth_token: token.to_string(),
            }),
            (None, _) => Err(DomainError::MissingCredentials(
                "account sid is missing".to_string(),
            )),
            (_, None) => Err(DomainError::MissingCredentials(
                "auth token is missing".to_string(),
            )),
        }
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }
}

impl fmt::Debug for CarrierCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarrierCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .finish()
    }
}

/// Mutation applied to an in-progress call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallUpdate {
    /// Fetch a new control document from this URL (POST)
    Redirect { url: String },
    /// Replace the running control document inline
    Twiml(String),
    /// Hang the leg up
    Complete,
}

/// New outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: String,
    pub from: String,
    pub twiml: String,
    pub status_callback: String,
    pub status_callback_events: Vec<String>,
}

/// Call leg detail record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallResource {
    pub sid: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl CallResource {
    /// Billed duration in seconds; unparsable or missing values count as zero
    pub fn duration_secs(&self) -> f64 {
        self.duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

/// Conference resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConferenceResource {
    pub sid: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
    #[serde(default)]
    pub reason_conference_ended: Option<String>,
}

impl ConferenceResource {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Seconds between creation and last update, zero when either is unknown
    pub fn overall_duration_secs(&self) -> f64 {
        let created = self.date_created.as_deref().and_then(parse_carrier_timestamp);
        let updated = self.date_updated.as_deref().and_then(parse_carrier_timestamp);

        match (created, updated) {
            (Some(created), Some(updated)) => {
                (updated - created).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        }
    }
}

/// Conference participant currently connected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceParticipant {
    pub call_sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Parse the carrier's timestamp format (RFC 2822), falling back to RFC 3339
pub fn parse_carrier_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}

/// Authenticated call-control client for one carrier account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Update an in-progress call (redirect, inline document, or hangup)
    async fn update_call(&self, call_sid: &str, update: CallUpdate) -> Result<()>;

    /// Place a new outbound call
    async fn create_call(&self, call: &OutboundCall) -> Result<CallResource>;

    /// Fetch a call leg detail record
    async fn fetch_call(&self, call_sid: &str) -> Result<CallResource>;

    /// Fetch a conference
    async fn fetch_conference(&self, conference_sid: &str) -> Result<ConferenceResource>;

    /// Force a conference to end
    async fn complete_conference(&self, conference_sid: &str) -> Result<()>;

    /// List participants currently connected to a conference
    async fn list_participants(&self, conference_sid: &str) -> Result<Vec<ConferenceParticipant>>;
}

/// Builds carrier clients from tenant credentials
#[cfg_attr(test, mockall::automock)]
pub trait CarrierClientFactory: Send + Sync {
    fn client(&self, credentials: &CarrierCredentials) -> Arc<dyn CarrierClient>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_credentials_rejected() {
        assert!(CarrierCredentials::from_parts(Some("AC1"), Some("tok")).is_ok());

        let missing_token = CarrierCredentials::from_parts(Some("AC1"), None).unwrap_err();
        assert!(matches!(missing_token, DomainError::MissingCredentials(_)));

        let blank_sid = CarrierCredentials::from_parts(Some("  "), Some("tok")).unwrap_err();
        assert!(matches!(blank_sid, DomainError::MissingCredentials(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = CarrierCredentials::from_parts(Some("AC1"), Some("secret-token")).unwrap();
        let printed = format!("{:?}", creds);

        assert!(printed.contains("AC1"));
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn test_call_duration_parsing() {
        let mut call = CallResource {
            sid: "CA1".to_string(),
            duration: Some("42".to_string()),
            ..Default::default()
        };
        assert_eq!(call.duration_secs(), 42.0);

        call.duration = None;
        assert_eq!(call.duration_secs(), 0.0);

        call.duration = Some("n/a".to_string());
        assert_eq!(call.duration_secs(), 0.0);
    }

    #[test]
    fn test_conference_overall_duration() {
        let conference = ConferenceResource {
            sid: "CF1".to_string(),
            status: "completed".to_string(),
            date_created: Some("Wed, 18 Aug 2010 20:20:06 +0000".to_string()),
            date_updated: Some("Wed, 18 Aug 2010 20:22:36 +0000".to_string()),
            ..Default::default()
        };

        assert!(conference.is_completed());
        assert_eq!(conference.overall_duration_secs(), 150.0);
    }

    #[test]
    fn test_conference_duration_unknown_dates() {
        let conference = ConferenceResource {
            sid: "CF1".to_string(),
            date_created: Some("yesterday".to_string()),
            ..Default::default()
        };

        assert!(!conference.is_completed());
        assert_eq!(conference.overall_duration_secs(), 0.0);
    }
}
