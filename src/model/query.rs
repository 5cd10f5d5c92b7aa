//! Input/output documents of the two policy queries.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

use super::{AuthContext, Message};

pub type HeaderFields = BTreeMap<String, String>;

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-hub-signature", "x-hub-signature-256"];

/// Input of the authorization query (`data.auth`).
#[derive(Debug, Clone, Serialize)]
pub struct AuthQueryInput {
    pub method: String,
    pub path: String,
    pub header: HeaderFields,
    pub auth: AuthContext,
}

impl AuthQueryInput {
    pub fn new(method: &Method, path: &str, headers: &HeaderMap, auth: AuthContext) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            header: header_fields(headers),
            auth,
        }
    }

    pub fn redacted(&self) -> Self {
        Self {
            header: redact_headers(&self.header),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthQueryOutput {
    pub allow: bool,
}

/// Input of the notification query (`data.msg.<schema>`).
#[derive(Debug, Clone, Serialize)]
pub struct MessageQueryInput {
    pub method: String,
    pub path: String,
    pub header: HeaderFields,
    pub body: serde_json::Value,
    pub auth: AuthContext,
}

impl MessageQueryInput {
    /// Same request fields as the authorization query, plus the decoded body.
    pub fn from_auth(auth_input: AuthQueryInput, body: serde_json::Value) -> Self {
        Self {
            method: auth_input.method,
            path: auth_input.path,
            header: auth_input.header,
            body,
            auth: auth_input.auth,
        }
    }

    pub fn redacted(&self) -> Self {
        Self {
            header: redact_headers(&self.header),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageQueryOutput {
    #[serde(rename = "msg")]
    pub messages: Vec<Message>,
}

/// Flatten request headers into `Canonical-Name -> value`.
///
/// Names are canonicalized (`x-github-event` -> `X-Github-Event`) because the
/// transport lowercases them; when a header repeats, the last value wins.
pub fn header_fields(headers: &HeaderMap) -> HeaderFields {
    let mut out = HeaderFields::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.insert(canonical_header_name(name.as_str()), value);
    }
    out
}

pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Copy of `fields` safe for structured logging.
pub fn redact_headers(fields: &HeaderFields) -> HeaderFields {
    fields
        .iter()
        .map(|(name, value)| {
            if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                (name.clone(), REDACTED.to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn header_names_are_canonicalized_and_last_value_wins() {
        let mut headers = HeaderMap::new();
        headers.append("x-github-event", HeaderValue::from_static("push"));
        headers.append("x-custom", HeaderValue::from_static("first"));
        headers.append("x-custom", HeaderValue::from_static("second"));

        let fields = header_fields(&headers);
        assert_eq!(fields.get("X-Github-Event").map(String::as_str), Some("push"));
        assert_eq!(fields.get("X-Custom").map(String::as_str), Some("second"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn authorization_is_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret-token"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let input = AuthQueryInput::new(&Method::POST, "/msg/x", &headers, AuthContext::default());
        let redacted = input.redacted();

        assert_eq!(redacted.header["Authorization"], "[REDACTED]");
        assert_eq!(redacted.header["Content-Type"], "application/json");
        // the query input itself keeps the real value
        assert_eq!(input.header["Authorization"], "Bearer secret-token");
    }

    #[test]
    fn undefined_outputs_decode_as_empty() {
        let auth: AuthQueryOutput = serde_json::from_value(json!({})).unwrap();
        assert!(!auth.allow);

        let msg: MessageQueryOutput = serde_json::from_value(json!({})).unwrap();
        assert!(msg.messages.is_empty());

        let msg: MessageQueryOutput =
            serde_json::from_value(json!({"msg": [{"channel": "c", "body": "hi"}]})).unwrap();
        assert_eq!(msg.messages[0].channel, "c");
        assert_eq!(msg.messages[0].body, "hi");
        assert!(msg.messages[0].fields.is_empty());
    }
}
