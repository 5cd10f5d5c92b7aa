/*
 * Responsibility
 * - body を一度だけ読み、Content-Type に従って decode する
 *   - application/json (+json) → JSON
 *   - text/plain + SNS header → JSON (SNS は Content-Type を text/plain で送ってくる)
 *   - それ以外 → 生テキスト
 * - decode 失敗は 400 (認可より前に返す: policy は一度も呼ばれない)
 */
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header},
};
use mime::Mime;
use serde_json::Value;

use crate::error::AppError;
use crate::services::auth::sns;

#[derive(Debug, Clone)]
pub struct NormalizedBody(pub Value);

impl<S> FromRequest<S> for NormalizedBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;

        normalize(&headers, &body).map(NormalizedBody)
    }
}

fn is_json(mime: &Mime) -> bool {
    mime.type_() == mime::APPLICATION
        && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
}

fn is_plain_text(mime: &Mime) -> bool {
    mime.type_() == mime::TEXT && mime.subtype() == mime::PLAIN
}

pub fn normalize(headers: &HeaderMap, body: &[u8]) -> Result<Value, AppError> {
    let raw = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let content_type: Mime = raw
        .parse()
        .map_err(|_| AppError::UnsupportedContentType(raw.to_string()))?;

    let sns_delivery = headers.contains_key(sns::MESSAGE_ID_HEADER);

    if is_json(&content_type) || (sns_delivery && is_plain_text(&content_type)) {
        serde_json::from_slice(body).map_err(|e| AppError::InvalidInput(e.to_string()))
    } else {
        Ok(Value::String(String::from_utf8_lossy(body).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn headers(content_type: Option<&'static str>, sns: bool) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(ct) = content_type {
            h.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        if sns {
            h.insert(sns::MESSAGE_ID_HEADER, HeaderValue::from_static("msg-1"));
        }
        h
    }

    #[test]
    fn json_bodies_are_parsed() {
        let value = normalize(
            &headers(Some("application/json; charset=utf-8"), false),
            br#"{"a":[1,true,null]}"#,
        )
        .unwrap();
        assert_eq!(value, json!({"a": [1, true, null]}));

        let value =
            normalize(&headers(Some("application/vnd.api+json"), false), b"[1]").unwrap();
        assert_eq!(value, json!([1]));
    }

    #[test]
    fn invalid_json_is_client_error() {
        let err = normalize(&headers(Some("application/json"), false), b"{nope").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = normalize(&headers(Some("application/json"), false), b"").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn sns_plain_text_is_parsed_as_json() {
        let value = normalize(
            &headers(Some("text/plain; charset=UTF-8"), true),
            br#"{"Type":"Notification"}"#,
        )
        .unwrap();
        assert_eq!(value, json!({"Type": "Notification"}));
    }

    #[test]
    fn other_content_is_raw_text() {
        let value = normalize(&headers(Some("text/plain"), false), b"{not json}").unwrap();
        assert_eq!(value, json!("{not json}"));

        let value = normalize(
            &headers(Some("application/x-www-form-urlencoded"), false),
            b"a=1&b=2",
        )
        .unwrap();
        assert_eq!(value, json!("a=1&b=2"));
    }

    #[test]
    fn missing_content_type_is_rejected() {
        let err = normalize(&headers(None, false), b"{}").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedContentType(_)));
    }
}
