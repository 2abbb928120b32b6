//! Twilio REST adapter for the carrier call-control port

use crate::domain::carrier::{
    CallResource, CallUpdate, CarrierClient, CarrierClientFactory, CarrierCredentials,
    ConferenceParticipant, ConferenceResource, OutboundCall,
};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ParticipantPage {
    #[serde(default)]
    participants: Vec<ConferenceParticipant>,
}

/// Client bound to one Twilio account
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CarrierCredentials,
}

impl TwilioClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, credentials: CarrierCredentials) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{}.json",
            self.base_url,
            self.credentials.account_sid(),
            resource
        )
    }

    fn get(&self, resource: &str) -> RequestBuilder {
        self.http
            .get(self.url(resource))
            .basic_auth(self.credentials.account_sid(), Some(self.credentials.auth_token()))
    }

    fn post<T: serde::Serialize + ?Sized>(&self, resource: &str, form: &T) -> RequestBuilder {
        self.http
            .post(self.url(resource))
            .basic_auth(self.credentials.account_sid(), Some(self.credentials.auth_token()))
            .form(form)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::carrier(None, format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(ApiError {
                code,
                message: Some(message),
            }) => match code {
                Some(code) => format!("{message} (code {code})"),
                None => message,
            },
            _ => format!("carrier returned {status}"),
        };
        Err(DomainError::carrier(Some(status.as_u16()), message))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DomainError::carrier(None, format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl CarrierClient for TwilioClient {
    async fn update_call(&self, call_sid: &str, update: CallUpdate) -> Result<()> {
        let form: Vec<(&str, String)> = match update {
            CallUpdate::Redirect { url } => vec![("Url", url), ("Method", "POST".to_string())],
            CallUpdate::Twiml(twiml) => vec![("Twiml", twiml)],
            CallUpdate::Complete => vec![("Status", "completed".to_string())],
        };
        debug!(%call_sid, "Updating call");
        self.execute(self.post(&format!("Calls/{call_sid}"), &form))
            .await
            .map(|_| ())
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<CallResource> {
        let mut form: Vec<(&str, &str)> = vec![
            ("To", call.to.as_str()),
            ("From", call.from.as_str()),
            ("Twiml", call.twiml.as_str()),
            ("StatusCallback", call.status_callback.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        form.extend(
            call.status_callback_events
                .iter()
                .map(|event| ("StatusCallbackEvent", event.as_str())),
        );
        self.fetch(self.post("Calls", &form)).await
    }

    async fn fetch_call(&self, call_sid: &str) -> Result<CallResource> {
        self.fetch(self.get(&format!("Calls/{call_sid}"))).await
    }

    async fn fetch_conference(&self, conference_sid: &str) -> Result<ConferenceResource> {
        self.fetch(self.get(&format!("Conferences/{conference_sid}")))
            .await
    }

    async fn complete_conference(&self, conference_sid: &str) -> Result<()> {
        self.execute(self.post(
            &format!("Conferences/{conference_sid}"),
            &[("Status", "completed")],
        ))
        .await
        .map(|_| ())
    }

    async fn list_participants(&self, conference_sid: &str) -> Result<Vec<ConferenceParticipant>> {
        let page: ParticipantPage = self
            .fetch(self.get(&format!("Conferences/{conference_sid}/Participants")))
            .await?;
        Ok(page.participants)
    }
}

/// Builds per-tenant clients sharing one connection pool
#[derive(Clone)]
pub struct TwilioClientFactory {
    http: reqwest::Client,
    base_url: String,
}

impl TwilioClientFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

impl CarrierClientFactory for TwilioClientFactory {
    fn client(&self, credentials: &CarrierCredentials) -> Arc<dyn CarrierClient> {
        Arc::new(TwilioClient::new(
            self.http.clone(),
            self.base_url.clone(),
            credentials.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> Arc<dyn CarrierClient> {
        let credentials = CarrierCredentials::from_parts(Some("AC1"), Some("tok")).unwrap();
        TwilioClientFactory::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .client(&credentials)
    }

    #[tokio::test]
    async fn test_redirect_posts_url_and_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/AC1/Calls/CA1.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("Url=https%3A%2F%2Fbridge%2Fentry%3Fa%3D1"))
            .and(body_string_contains("Method=POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sid": "CA1"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_call(
                "CA1",
                CallUpdate::Redirect {
                    url: "https://bridge/entry?a=1".to_string(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_call_repeats_status_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/AC1/Calls.json"))
            .and(body_string_contains("To=%2B1555"))
            .and(body_string_contains("StatusCallbackEvent=initiated"))
            .and(body_string_contains("StatusCallbackEvent=completed"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "CA2",
                "from": "+1800",
                "to": "+1555",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let call = client(&server)
            .create_call(&OutboundCall {
                to: "+1555".to_string(),
                from: "+1800".to_string(),
                twiml: "<Response/>".to_string(),
                status_callback: "https://bridge/twilio/transfer-status".to_string(),
                status_callback_events: vec!["initiated".to_string(), "completed".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(call.sid, "CA2");
        assert_eq!(call.status, "queued");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_carrier_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Accounts/AC1/Conferences/CF1.json"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 20404,
                "message": "The requested resource was not found",
                "status": 404
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_conference("CF1").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("20404"));
    }

    #[tokio::test]
    async fn test_participants_and_call_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Accounts/AC1/Conferences/CF1/Participants.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "participants": [{"call_sid": "CA1", "status": "connected"}],
                "page": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Accounts/AC1/Calls/CA1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sid": "CA1",
                "from": "+1800",
                "to": "+1555",
                "status": "completed",
                "duration": "42",
                "start_time": "Wed, 18 Aug 2010 20:20:06 +0000",
                "end_time": "Wed, 18 Aug 2010 20:20:48 +0000"
            })))
            .mount(&server)
            .await;

        let carrier = client(&server);
        let participants = carrier.list_participants("CF1").await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].call_sid, "CA1");

        let call = carrier.fetch_call("CA1").await.unwrap();
        assert_eq!(call.duration_secs(), 42.0);
    }

    #[tokio::test]
    async fn test_complete_conference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/AC1/Conferences/CF1.json"))
            .and(body_string_contains("Status=completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sid": "CF1"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).complete_conference("CF1").await.unwrap();
    }
}
