//! OIDC bearer-token verification against a fixed issuer key set.
//!
//! Soft-failing: fetch or verification errors are logged at debug level and the
//! request continues without evidence for this issuer.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, jwk::Jwk};
use thiserror::Error;
use tracing::debug;

use super::{
    InboundRequest, VerifyError, Verifier,
    jwks::{JwksError, JwksSource},
};
use crate::model::{Claims, Evidence};

const GITHUB_ACTIONS_JWKS_URL: &str = "https://token.actions.githubusercontent.com/.well-known/jwks";
const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidcIssuer {
    /// Machine identity: GitHub Actions workflow tokens.
    GitHubActions,
    /// End-user identity: Google ID tokens.
    Google,
}

impl OidcIssuer {
    pub fn jwks_url(&self) -> &'static str {
        match self {
            Self::GitHubActions => GITHUB_ACTIONS_JWKS_URL,
            Self::Google => GOOGLE_JWKS_URL,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::GitHubActions => "github_action",
            Self::Google => "google_id_token",
        }
    }

    fn evidence(&self, claims: Claims) -> Evidence {
        match self {
            Self::GitHubActions => Evidence::GitHubAction(claims),
            Self::Google => Evidence::Google(claims),
        }
    }
}

#[derive(Debug, Error)]
pub enum OidcError {
    #[error(transparent)]
    Jwks(#[from] JwksError),
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("unsupported token alg: {0:?}")]
    UnsupportedAlg(Algorithm),
    #[error("no key in JWK set matches kid {0:?}")]
    KeyNotFound(Option<String>),
}

pub struct OidcVerifier {
    issuer: OidcIssuer,
    keys: Arc<dyn JwksSource>,
}

impl OidcVerifier {
    pub fn new(issuer: OidcIssuer, keys: Arc<dyn JwksSource>) -> Self {
        Self { issuer, keys }
    }

    /// Verify signature, `exp` and `nbf` of `token` and return all of its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, OidcError> {
        let header = jsonwebtoken::decode_header(token)?;

        // HS* keys are never accepted.
        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(OidcError::UnsupportedAlg(header.alg));
        }

        let jwk = self.find_key(header.kid.as_deref()).await?;
        let decoding_key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Audience and issuer checks are left to the policy engine.
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(data.claims)
    }

    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, OidcError> {
        let url = self.issuer.jwks_url();
        let keys = self.keys.key_set(url, false).await?;

        let Some(kid) = kid else {
            return keys
                .keys
                .first()
                .cloned()
                .ok_or(OidcError::KeyNotFound(None));
        };

        if let Some(jwk) = keys.find(kid) {
            return Ok(jwk.clone());
        }

        // Keys rotate; refresh once before giving up.
        let keys = self.keys.key_set(url, true).await?;
        keys.find(kid)
            .cloned()
            .ok_or_else(|| OidcError::KeyNotFound(Some(kid.to_string())))
    }
}

/// Extract the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn token_preview(token: &str) -> String {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    format!("{}...", &token[..end])
}

#[async_trait]
impl Verifier for OidcVerifier {
    fn scheme(&self) -> &'static str {
        self.issuer.scheme()
    }

    async fn inspect(&self, req: &InboundRequest) -> Result<Option<Evidence>, VerifyError> {
        let Some(token) = req.header("authorization").and_then(bearer_token) else {
            return Ok(None);
        };

        match self.verify(token).await {
            Ok(claims) => Ok(Some(self.issuer.evidence(claims))),
            Err(err) => {
                debug!(
                    scheme = self.scheme(),
                    token = %token_preview(token),
                    error = %err,
                    "bearer token not verified"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::jwks::StaticJwks;
    use aws_lc_rs::{
        rand::SystemRandom,
        signature::{Ed25519KeyPair, KeyPair},
    };
    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue};
    use base64::Engine as _;
    use jsonwebtoken::{EncodingKey, Header, jwk::JwkSet};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TestKey {
        encoding: EncodingKey,
        jwks: JwkSet,
    }

    fn test_key(kid: &str) -> TestKey {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let x = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(pair.public_key().as_ref());

        let jwks: JwkSet = serde_json::from_value(json!({
            "keys": [{"kty": "OKP", "crv": "Ed25519", "x": x, "kid": kid, "alg": "EdDSA", "use": "sig"}]
        }))
        .unwrap();

        TestKey {
            encoding: EncodingKey::from_ed_der(pkcs8.as_ref()),
            jwks,
        }
    }

    fn now() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
    }

    fn sign(key: &TestKey, kid: &str, claims: serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());
        jsonwebtoken::encode(&header, &claims, &key.encoding).unwrap()
    }

    fn request(authorization: &str) -> InboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(authorization).unwrap());
        InboundRequest {
            headers,
            body: Bytes::new(),
        }
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[tokio::test]
    async fn valid_token_yields_all_claims() {
        let key = test_key("k1");
        let exp = now() + 600;
        let token = sign(
            &key,
            "k1",
            json!({"sub": "repo:octo/app:ref:refs/heads/main", "repository": "octo/app", "exp": exp}),
        );
        let verifier = OidcVerifier::new(
            OidcIssuer::GitHubActions,
            Arc::new(StaticJwks::new(key.jwks.clone())),
        );

        let evidence = verifier
            .inspect(&request(&format!("Bearer {token}")))
            .await
            .unwrap();
        let Some(Evidence::GitHubAction(claims)) = evidence else {
            panic!("expected github action evidence");
        };
        assert_eq!(claims["repository"], "octo/app");
        assert_eq!(claims["exp"], json!(exp));
    }

    #[tokio::test]
    async fn google_issuer_fills_its_own_slot() {
        let key = test_key("g1");
        let token = sign(&key, "g1", json!({"email": "a@example.com", "exp": now() + 600}));
        let verifier =
            OidcVerifier::new(OidcIssuer::Google, Arc::new(StaticJwks::new(key.jwks.clone())));

        let evidence = verifier
            .inspect(&request(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert!(matches!(evidence, Some(Evidence::Google(_))));
    }

    #[tokio::test]
    async fn expired_token_is_a_soft_failure() {
        let key = test_key("k1");
        let token = sign(&key, "k1", json!({"sub": "x", "exp": now() - 3600}));
        let verifier = OidcVerifier::new(
            OidcIssuer::GitHubActions,
            Arc::new(StaticJwks::new(key.jwks.clone())),
        );

        let evidence = verifier
            .inspect(&request(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert!(evidence.is_none());
    }

    #[tokio::test]
    async fn token_signed_by_unknown_key_is_a_soft_failure() {
        let published = test_key("k1");
        let attacker = test_key("k1");
        let token = sign(&attacker, "k1", json!({"sub": "x", "exp": now() + 600}));
        let source = Arc::new(StaticJwks::new(published.jwks.clone()));
        let verifier = OidcVerifier::new(OidcIssuer::GitHubActions, source);

        let evidence = verifier
            .inspect(&request(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert!(evidence.is_none());
    }

    #[tokio::test]
    async fn unknown_kid_refreshes_once() {
        let key = test_key("k1");
        let token = sign(&key, "other", json!({"sub": "x", "exp": now() + 600}));
        let source = Arc::new(StaticJwks::new(key.jwks.clone()));
        let verifier = OidcVerifier::new(OidcIssuer::GitHubActions, source.clone());

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, OidcError::KeyNotFound(Some(ref kid)) if kid == "other"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn symmetric_tokens_are_rejected() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "x", "exp": now() + 600}),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let verifier = OidcVerifier::new(OidcIssuer::Google, Arc::new(StaticJwks::empty()));

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, OidcError::UnsupportedAlg(Algorithm::HS256)));
    }

    #[tokio::test]
    async fn key_set_fetch_failure_is_a_soft_failure() {
        let verifier = OidcVerifier::new(OidcIssuer::Google, Arc::new(StaticJwks::empty()));
        let evidence = verifier
            .inspect(&request("Bearer eyJhbGciOiJSUzI1NiIsImtpZCI6ImsxIn0.e30.c2ln"))
            .await
            .unwrap();
        assert!(evidence.is_none());
    }

    #[tokio::test]
    async fn non_bearer_requests_are_ignored() {
        let verifier = OidcVerifier::new(OidcIssuer::Google, Arc::new(StaticJwks::empty()));
        let evidence = verifier.inspect(&request("Basic dXNlcjpwYXNz")).await.unwrap();
        assert!(evidence.is_none());
    }
}
