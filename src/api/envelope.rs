//! Envelope normalization. The backend wraps everything in a
//! `{success, data|error}` envelope, but the exact shape drifts between
//! endpoints (token at the top level or under `data`, payloads nested one
//! level deeper than documented). All shape probing happens here so the rest
//! of the crate deals only in typed records.

use serde_json::{json, Value};

/// Parse a response body as JSON, wrapping non-JSON text so the raw body is
/// still available as a message.
pub(crate) fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({ "message": body }))
}

/// True when the envelope itself reports failure, regardless of HTTP status.
pub(crate) fn reports_failure(value: &Value) -> bool {
    value["success"] == Value::Bool(false)
}

/// The backend's error code, when the structured envelope carries one.
pub(crate) fn error_code(value: &Value) -> Option<&str> {
    value["error"]["code"].as_str()
}

/// Most specific human-readable message available in an error envelope.
pub(crate) fn error_message(value: &Value, fallback: &str) -> String {
    value["error"]["message"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .or_else(|| value["error"].as_str())
        .map_or_else(|| fallback.to_string(), str::to_string)
}

/// The payload object, whether or not the endpoint nested it under `data`.
#[must_use]
pub fn data(value: &Value) -> &Value {
    if value["data"].is_object() {
        &value["data"]
    } else {
        value
    }
}

/// Bearer token from a login response. Some deployments return it at the top
/// level, others under `data`; both must land in the same session state.
#[must_use]
pub fn extract_token(value: &Value) -> Option<String> {
    value["token"]
        .as_str()
        .or_else(|| value["data"]["token"].as_str())
        .map(str::to_string)
}
