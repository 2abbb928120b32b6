//! Callback URLs handed to the carrier
//!
//! Webhook handlers keep no state between deliveries. Every correlation key
//! they need (`mainCallSid`, `conferenceName`, `companyid`) travels in the
//! query string of the URL the carrier calls back.

/// Route prefix of every carrier webhook
pub const WEBHOOK_PREFIX: &str = "/twilio";

/// Route prefix of the AI provider's webhooks
pub const AI_WEBHOOK_PREFIX: &str = "/whook";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    base_url: String,
}

impl CallbackUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Control endpoint the caller leg is redirected to on transfer
    pub fn transfer_entry_point(
        &self,
        conference_name: &str,
        tenant_id: &str,
        main_call_sid: &str,
        record: bool,
        max_duration: Option<u32>,
    ) -> String {
        let record = record.to_string();
        let max_duration = max_duration.map(|d| d.to_string()).unwrap_or_default();
        self.route(
            "transfer-conference-entry-point",
            &[
                ("conferenceName", conference_name),
                ("mainCallSid", main_call_sid),
                ("record", &record),
                ("max_dur", &max_duration),
                ("companyid", tenant_id),
            ],
        )
    }

    pub fn conference_status(&self, conference_name: &str, main_call_sid: &str, tenant_id: &str) -> String {
        self.route(
            "conference-status",
            &[
                ("conferenceName", conference_name),
                ("mainCallSid", main_call_sid),
                ("companyid", tenant_id),
            ],
        )
    }

    pub fn recording_status(&self, conference_name: &str, main_call_sid: &str, tenant_id: &str) -> String {
        self.route(
            "recording-status",
            &[
                ("conferenceName", conference_name),
                ("mainCallSid", main_call_sid),
                ("companyid", tenant_id),
            ],
        )
    }

    pub fn transfer_status(&self, main_call_sid: &str) -> String {
        self.route("transfer-status", &[("mainCallSid", main_call_sid)])
    }

    /// Action URL of the inbound media stream; hit when the stream ends
    pub fn call_status(&self, ai_call_id: &str) -> String {
        self.route("callStatus", &[("callId", ai_call_id)])
    }

    /// Where the AI provider posts `call.ended`
    pub fn ai_call_ended(&self) -> String {
        format!("{}{}/callend", self.base_url, AI_WEBHOOK_PREFIX)
    }

    fn route(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}/{}", self.base_url, WEBHOOK_PREFIX, path);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&serde_urlencoded::to_string(params).unwrap_or_default());
        }
        url
    }
}
