//! Lenient extraction of carrier callback payloads
//!
//! Carrier webhooks arrive form-encoded, test tooling tends to post JSON,
//! and a malformed body must never turn into a 4xx the carrier retries
//! forever. Anything unparsable becomes an empty field set.

use crate::domain::CallbackFields;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Parse a webhook body into raw callback fields
pub fn callback_fields(headers: &HeaderMap, body: &[u8]) -> CallbackFields {
    if body.is_empty() {
        return CallbackFields::new();
    }

    let parsed: Result<CallbackFields, String> = if is_json(headers) {
        serde_json::from_slice::<serde_json::Map<String, Value>>(body)
            .map(|map| map.into_iter().map(|(k, v)| (k, flatten(v))).collect())
            .map_err(|e| e.to_string())
    } else {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map(|pairs| pairs.into_iter().collect())
            .map_err(|e| e.to_string())
    };

    parsed.unwrap_or_else(|e| {
        warn!(error = %e, "Unparsable callback body, treating as empty");
        CallbackFields::new()
    })
}

/// Parse a raw query string, falling back to the default on any error
pub fn lenient_query<T: DeserializeOwned + Default>(raw: Option<&str>) -> T {
    raw.and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default()
}

/// Carrier control document response
pub fn twiml(status: StatusCode, document: String) -> Response {
    (status, [(CONTENT_TYPE, "text/xml")], document).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}

fn flatten(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
