//! Amazon SNS HTTP(S) notification signature verification.
//!
//! Unlike the other schemes this one hard-fails: once a request carries the SNS
//! message-id header, any problem (bad envelope, foreign certificate URL, fetch
//! failure, unknown version, bad signature) rejects the request.

use std::sync::Arc;

use async_trait::async_trait;
use aws_lc_rs::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use super::{InboundRequest, VerifyError, Verifier};
use crate::model::{AwsSnsAuth, Evidence};

pub const MESSAGE_ID_HEADER: &str = "x-amz-sns-message-id";
const CERT_HOST_SUFFIX: &str = ".amazonaws.com";

/// SNS JSON envelope. Absent fields decode as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SnsMessage {
    #[serde(rename = "Type")]
    pub message_type: String,
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "TopicArn")]
    pub topic_arn: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Signature")]
    pub signature: String,
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: String,
    #[serde(rename = "SubscribeURL")]
    pub subscribe_url: String,
    #[serde(rename = "UnsubscribeURL")]
    pub unsubscribe_url: String,
}

impl SnsMessage {
    /// The newline-joined `key\nvalue\n` string the signature covers.
    pub fn string_to_sign(&self) -> Result<String, VerifyError> {
        let mut parts: Vec<(&str, &str)> = Vec::with_capacity(7);

        match self.message_type.as_str() {
            "Notification" => {
                parts.push(("Message", &self.message));
                parts.push(("MessageId", &self.message_id));
                if !self.subject.is_empty() {
                    parts.push(("Subject", &self.subject));
                }
                parts.push(("Timestamp", &self.timestamp));
                parts.push(("TopicArn", &self.topic_arn));
                parts.push(("Type", &self.message_type));
            }
            "SubscriptionConfirmation" | "UnsubscribeConfirmation" => {
                parts.push(("Message", &self.message));
                parts.push(("MessageId", &self.message_id));
                parts.push(("SubscribeURL", &self.subscribe_url));
                parts.push(("Timestamp", &self.timestamp));
                parts.push(("Token", &self.token));
                parts.push(("TopicArn", &self.topic_arn));
                parts.push(("Type", &self.message_type));
            }
            other => return Err(VerifyError::UnknownMessageType(other.to_string())),
        }

        let mut out = String::new();
        for (key, value) in parts {
            out.push_str(key);
            out.push('\n');
            out.push_str(value);
            out.push('\n');
        }
        Ok(out)
    }

    fn auth(&self) -> AwsSnsAuth {
        AwsSnsAuth {
            message_type: self.message_type.clone(),
            message_id: self.message_id.clone(),
            topic_arn: self.topic_arn.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Accept only `https://*.amazonaws.com/...` on the default port.
pub fn validate_cert_url(raw: &str) -> Result<Url, VerifyError> {
    let url = Url::parse(raw).map_err(|source| VerifyError::InvalidCertUrl {
        url: raw.to_string(),
        source,
    })?;

    let host_ok = url
        .host_str()
        .is_some_and(|host| host.to_ascii_lowercase().ends_with(CERT_HOST_SUFFIX));

    if url.scheme() != "https" || !host_ok || url.port().is_some() {
        return Err(VerifyError::UnacceptableCertUrl(raw.to_string()));
    }
    Ok(url)
}

/// Map `SignatureVersion` to the RSA PKCS#1 v1.5 verification algorithm.
fn signature_algorithm(version: &str) -> Result<&'static dyn VerificationAlgorithm, VerifyError> {
    match version {
        "1" => Ok(&signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY),
        "2" => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
        other => Err(VerifyError::UnsupportedSignatureVersion(other.to_string())),
    }
}

/// Verify a base64 `signature` over `message` with a DER `RSAPublicKey`.
pub fn verify_signature(
    public_key: &[u8],
    version: &str,
    message: &str,
    signature: &str,
) -> Result<(), VerifyError> {
    let algorithm = signature_algorithm(version)?;
    let signature = base64::engine::general_purpose::STANDARD.decode(signature.trim())?;

    UnparsedPublicKey::new(algorithm, public_key)
        .verify(message.as_bytes(), &signature)
        .map_err(|_| VerifyError::SignatureMismatch)
}

/// Extract the subject public key from a PEM-encoded X.509 certificate.
pub fn public_key_from_pem(pem: &[u8]) -> Result<Vec<u8>, VerifyError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem)
        .map_err(|e| VerifyError::InvalidCertificate(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| VerifyError::InvalidCertificate(e.to_string()))?;

    Ok(cert.public_key().subject_public_key.data.to_vec())
}

/// Where signing certificates come from.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetch the PEM certificate at an already-validated URL.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, VerifyError>;
}

pub struct HttpCertificateSource {
    client: reqwest::Client,
}

impl HttpCertificateSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CertificateSource for HttpCertificateSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, VerifyError> {
        let fetch_err = |source| VerifyError::CertFetch {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let body = resp.bytes().await.map_err(fetch_err)?;
        Ok(body.to_vec())
    }
}

pub struct SnsVerifier {
    certs: Arc<dyn CertificateSource>,
}

impl SnsVerifier {
    pub fn new(certs: Arc<dyn CertificateSource>) -> Self {
        Self { certs }
    }

    pub async fn verify(&self, body: &[u8]) -> Result<AwsSnsAuth, VerifyError> {
        let msg: SnsMessage = serde_json::from_slice(body).map_err(VerifyError::InvalidEnvelope)?;
        let string_to_sign = msg.string_to_sign()?;

        let cert_url = validate_cert_url(&msg.signing_cert_url)?;
        let pem = self.certs.fetch(&cert_url).await?;
        let public_key = public_key_from_pem(&pem)?;

        verify_signature(
            &public_key,
            &msg.signature_version,
            &string_to_sign,
            &msg.signature,
        )?;

        Ok(msg.auth())
    }
}

#[async_trait]
impl Verifier for SnsVerifier {
    fn scheme(&self) -> &'static str {
        "aws_sns"
    }

    async fn inspect(&self, req: &InboundRequest) -> Result<Option<Evidence>, VerifyError> {
        if !req.has_header(MESSAGE_ID_HEADER) {
            return Ok(None);
        }

        let auth = self.verify(&req.body).await?;
        Ok(Some(Evidence::AwsSns(auth)))
    }
}

/// Certificate source for tests: serves fixed bytes and counts fetches.
#[cfg(test)]
pub struct StaticCertificate {
    pem: Option<Vec<u8>>,
    pub fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl StaticCertificate {
    pub fn new(pem: impl Into<Vec<u8>>) -> Self {
        Self {
            pem: Some(pem.into()),
            fetches: Default::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            pem: None,
            fetches: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CertificateSource for StaticCertificate {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, VerifyError> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.pem
            .clone()
            .ok_or_else(|| VerifyError::InvalidCertificate(format!("no certificate at {url}")))
    }
}

/// RSA key with a self-signed certificate, for signing SNS envelopes in tests.
#[cfg(test)]
pub struct TestSigner {
    pair: aws_lc_rs::signature::RsaKeyPair,
    pub cert_pem: String,
}

#[cfg(test)]
impl TestSigner {
    pub fn new() -> Self {
        let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256).unwrap();
        let cert = rcgen::CertificateParams::new(vec!["sns.us-east-1.amazonaws.com".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let pair = aws_lc_rs::signature::RsaKeyPair::from_pkcs8(&key.serialize_der()).unwrap();

        Self {
            pair,
            cert_pem: cert.pem(),
        }
    }

    pub fn public_key(&self) -> Vec<u8> {
        use aws_lc_rs::signature::KeyPair;
        self.pair.public_key().as_ref().to_vec()
    }

    /// Base64 RSA-PKCS1-SHA256 signature, as SNS sends for `SignatureVersion` 2.
    pub fn sign(&self, message: &str) -> String {
        let mut sig = vec![0u8; self.pair.public_modulus_len()];
        self.pair
            .sign(
                &signature::RSA_PKCS1_SHA256,
                &aws_lc_rs::rand::SystemRandom::new(),
                message.as_bytes(),
                &mut sig,
            )
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(sig)
    }

    /// JSON body of `msg`, signed over its canonical string.
    pub fn envelope(&self, msg: &SnsMessage) -> serde_json::Value {
        let signature = self.sign(&msg.string_to_sign().unwrap());
        serde_json::json!({
            "Type": msg.message_type,
            "MessageId": msg.message_id,
            "Token": msg.token,
            "TopicArn": msg.topic_arn,
            "Subject": msg.subject,
            "Message": msg.message,
            "Timestamp": msg.timestamp,
            "SignatureVersion": msg.signature_version,
            "Signature": signature,
            "SigningCertURL": msg.signing_cert_url,
            "SubscribeURL": msg.subscribe_url,
        })
    }
}
