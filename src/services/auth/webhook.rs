//! GitHub webhook verification (HMAC-SHA-256 over the raw body).
//!
//! Soft-failing: a request whose signature matches none of the configured
//! secrets simply carries no GitHub app evidence.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::{InboundRequest, VerifyError, Verifier};
use crate::config::Secret;
use crate::model::{Evidence, GitHubAppAuth};

type HmacSha256 = Hmac<Sha256>;

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

pub struct GitHubWebhookVerifier {
    secrets: Vec<Secret>,
}

impl GitHubWebhookVerifier {
    pub fn new(secrets: Vec<Secret>) -> Self {
        Self { secrets }
    }

    /// True when `body` is signed by any configured secret.
    pub fn signature_matches(&self, signature_header: &str, body: &[u8]) -> bool {
        let Some(provided) = signature_header
            .trim()
            .strip_prefix(SIGNATURE_PREFIX)
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
        else {
            return false;
        };

        self.secrets.iter().any(|secret| {
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
                return false;
            };
            mac.update(body);
            let computed = mac.finalize().into_bytes();
            computed.as_slice().ct_eq(&provided).into()
        })
    }
}

#[async_trait]
impl Verifier for GitHubWebhookVerifier {
    fn scheme(&self) -> &'static str {
        "github_webhook"
    }

    async fn inspect(&self, req: &InboundRequest) -> Result<Option<Evidence>, VerifyError> {
        if !req.has_header(EVENT_HEADER) {
            return Ok(None);
        }

        let signature = req.header(SIGNATURE_HEADER).unwrap_or_default();
        if !self.signature_matches(signature, &req.body) {
            debug!("github webhook signature did not match any configured secret");
            return Ok(None);
        }

        Ok(Some(Evidence::GitHubApp(GitHubAppAuth::from_headers(
            &req.headers,
        ))))
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue};

    const BODY: &[u8] = br#"{"action":"opened"}"#;

    fn verifier(secrets: &[&str]) -> GitHubWebhookVerifier {
        GitHubWebhookVerifier::new(secrets.iter().map(|s| Secret::new(*s)).collect())
    }

    fn request(signature: Option<&str>, event: Option<&'static str>) -> InboundRequest {
        let mut headers = HeaderMap::new();
        if let Some(event) = event {
            headers.insert(EVENT_HEADER, HeaderValue::from_static(event));
        }
        if let Some(sig) = signature {
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(sig).unwrap());
        }
        headers.insert("x-github-delivery", HeaderValue::from_static("d-1"));
        headers.insert("x-github-hook-id", HeaderValue::from_static("42"));
        InboundRequest {
            headers,
            body: Bytes::from_static(BODY),
        }
    }

    #[tokio::test]
    async fn any_one_matching_secret_is_enough() {
        let v = verifier(&["first", "second", "third"]);
        let sig = sign("second", BODY);

        let evidence = v.inspect(&request(Some(sig.as_str()), Some("push"))).await.unwrap();
        let Some(Evidence::GitHubApp(app)) = evidence else {
            panic!("expected github app evidence");
        };
        assert_eq!(app.event, "push");
        assert_eq!(app.delivery, "d-1");
        assert_eq!(app.hook_id, 42);
    }

    #[tokio::test]
    async fn signature_matching_no_secret_is_a_soft_failure() {
        let v = verifier(&["first", "second"]);
        let sig = sign("other", BODY);

        let evidence = v.inspect(&request(Some(sig.as_str()), Some("push"))).await.unwrap();
        assert!(evidence.is_none());
    }

    #[tokio::test]
    async fn malformed_or_missing_signature_is_a_soft_failure() {
        let v = verifier(&["first"]);
        assert!(v.inspect(&request(None, Some("push"))).await.unwrap().is_none());
        assert!(
            v.inspect(&request(Some("sha256=zz"), Some("push")))
                .await
                .unwrap()
                .is_none()
        );
        let unprefixed = sign("first", BODY).trim_start_matches(SIGNATURE_PREFIX).to_string();
        assert!(
            v.inspect(&request(Some(unprefixed.as_str()), Some("push")))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn requests_without_event_header_are_ignored() {
        let v = verifier(&["first"]);
        let sig = sign("first", BODY);
        assert!(v.inspect(&request(Some(sig.as_str()), None)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_secrets_never_authenticates() {
        let v = verifier(&[]);
        let sig = sign("", BODY);
        assert!(v.inspect(&request(Some(sig.as_str()), Some("push"))).await.unwrap().is_none());
    }
}
