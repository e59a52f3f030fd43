//! Gateway response envelopes.
//!
//! API Gateway (and the Lambda function URL runtime) expect
//! `{statusCode, headers, body, isBase64Encoded?}` with a *string* body.
//! JSON payloads are serialised into that string; binary payloads are
//! base64-encoded and flagged so the gateway decodes them before sending.

use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// The envelope returned to the invoking gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_base64_encoded: Option<bool>,
}

impl ResponseEnvelope {
    /// Parse the body as JSON. Meant for callers and tests inspecting JSON
    /// responses; binary bodies fail.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Decode a base64 (binary) body.
    pub fn binary_body(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.body)
    }
}

fn cors_headers(content_type: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), content_type.to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "POST, OPTIONS".to_string(),
        ),
    ])
}

/// JSON response with the CORS header set.
pub fn json_response(status_code: u16, body: &Value) -> ResponseEnvelope {
    ResponseEnvelope {
        status_code,
        headers: cors_headers("application/json"),
        body: body.to_string(),
        is_base64_encoded: None,
    }
}

/// Zip download: base64 body, `Content-Disposition: attachment`.
pub fn binary_response(status_code: u16, bytes: &[u8], filename: &str) -> ResponseEnvelope {
    let mut headers = cors_headers("application/zip");
    headers.insert(
        "Content-Disposition".to_string(),
        format!("attachment; filename=\"{}\"", quote_filename(filename)),
    );
    ResponseEnvelope {
        status_code,
        headers,
        body: STANDARD.encode(bytes),
        is_base64_encoded: Some(true),
    }
}

/// Escape `"` and `\` for a quoted-string header value; control
/// characters are dropped so the header stays on one line.
fn quote_filename(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars().filter(|c| !c.is_control()) {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted
}

/// `{success: false, error, error_type}` with the error's status code.
pub fn error_response(err: &ConvertError) -> ResponseEnvelope {
    json_response(
        err.status_code(),
        &json!({
            "success": false,
            "error": err.to_string(),
            "error_type": err.kind(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_response_headers_and_body() {
        let r = json_response(200, &json!({"status": "healthy"}));
        assert_eq!(r.status_code, 200);
        assert_eq!(r.headers["Content-Type"], "application/json");
        assert_eq!(r.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(r.headers["Access-Control-Allow-Methods"], "POST, OPTIONS");
        assert_eq!(r.json_body().unwrap(), json!({"status": "healthy"}));
        assert_eq!(r.is_base64_encoded, None);
    }

    #[test]
    fn binary_response_is_base64_attachment() {
        let r = binary_response(200, b"PK\x03\x04", "x.zip");
        assert_eq!(r.headers["Content-Type"], "application/zip");
        assert_eq!(
            r.headers["Content-Disposition"],
            "attachment; filename=\"x.zip\""
        );
        assert_eq!(r.headers["Access-Control-Allow-Headers"], "Content-Type");
        assert_eq!(r.is_base64_encoded, Some(true));
        assert_eq!(r.binary_body().unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn attachment_filename_is_escaped() {
        let r = binary_response(200, b"PK", "x\".zip");
        assert_eq!(
            r.headers["Content-Disposition"],
            "attachment; filename=\"x\\\".zip\""
        );

        let r = binary_response(200, b"PK", "a\\b\r\nSet-Cookie: y.zip");
        assert_eq!(
            r.headers["Content-Disposition"],
            "attachment; filename=\"a\\\\bSet-Cookie: y.zip\""
        );
    }

    #[test]
    fn error_response_carries_kind() {
        let r = error_response(&ConvertError::MissingSource);
        assert_eq!(r.status_code, 400);
        let body = r.json_body().unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error_type"], "MissingSource");
    }

    #[test]
    fn envelope_serialises_gateway_field_names() {
        let v = serde_json::to_value(binary_response(200, b"x", "a.zip")).unwrap();
        assert_eq!(v["statusCode"], 200);
        assert_eq!(v["isBase64Encoded"], true);

        let v = serde_json::to_value(json_response(404, &json!({}))).unwrap();
        assert!(v.get("isBase64Encoded").is_none());
    }
}
