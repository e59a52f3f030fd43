//! Event normalisation: gateway envelope → conversion payload.
//!
//! Two invocation shapes reach the handler:
//!
//! * **Gateway proxy**: `{"body": "<json>", "isBase64Encoded": false,
//!   "httpMethod": "POST", "path": "/full", ...}` (REST API) or the HTTP API
//!   variant with `requestContext.http.method` and `rawPath`.
//! * **Direct invocation**: the event *is* the payload, with no method or
//!   path at all.
//!
//! A body that is not valid JSON yields an empty payload rather than an
//! error, so the request fails validation with a 400 instead of a 500.

use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use tracing::debug;

/// Extract the conversion payload from an invocation envelope.
pub fn normalize_event(event: &Value) -> Result<Value, ConvertError> {
    let Some(body) = event.get("body") else {
        // Direct invocation
        return Ok(event.clone());
    };

    if body.is_null() {
        return Ok(empty_payload());
    }

    let is_base64 = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_base64 {
        let encoded = body.as_str().ok_or_else(|| {
            ConvertError::InvalidBody("base64-encoded body must be a string".into())
        })?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ConvertError::InvalidBody(format!("body is not valid base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ConvertError::InvalidBody(format!("body is not valid UTF-8: {e}")))?;
        return Ok(parse_json_body(&text));
    }

    match body {
        Value::String(text) => Ok(parse_json_body(text)),
        structured => Ok(structured.clone()),
    }
}

fn parse_json_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|e| {
        debug!("Ignoring malformed JSON body: {}", e);
        empty_payload()
    })
}

fn empty_payload() -> Value {
    Value::Object(Map::new())
}

/// HTTP method and path of a request, as far as the envelope reveals them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// `None` for direct invocations.
    pub method: Option<String>,
    /// Empty for direct invocations.
    pub path: String,
}

impl RequestLine {
    /// Read `httpMethod` / `requestContext.http.method` and `path` / `rawPath`.
    pub fn from_event(event: &Value) -> Self {
        let method = event
            .get("httpMethod")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .or_else(|| {
                event
                    .pointer("/requestContext/http/method")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
            })
            .map(str::to_string);

        let path = event
            .get("path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .or_else(|| event.get("rawPath").and_then(Value::as_str))
            .unwrap_or("")
            .to_string();

        Self { method, path }
    }

    /// True when the envelope carries exactly this method.
    pub fn is(&self, method: &str) -> bool {
        self.method.as_deref() == Some(method)
    }

    /// Method used for routing: direct invocations count as `POST`.
    pub fn effective_method(&self) -> &str {
        self.method.as_deref().unwrap_or("POST")
    }
}
