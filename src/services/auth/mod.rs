//! Request authentication: one verifier per scheme, composed into a fixed chain.
//!
//! A verifier only acts on requests carrying its marker header and is a no-op
//! otherwise, so chain order does not change the outcome. Soft-failing schemes
//! swallow their own errors and return `Ok(None)`; only a hard failure surfaces
//! as `Err(VerifyError)`.

pub mod chain;
pub mod jwks;
pub mod oidc;
pub mod sns;
pub mod webhook;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::HeaderMap;
use thiserror::Error;

use crate::model::Evidence;

pub use chain::VerifierChain;

/// Buffered view of an inbound request, shared read-only by every verifier.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some_and(|v| !v.is_empty())
    }
}

/// Hard verification failures. Only the SNS scheme produces these.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid SNS message JSON: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("unknown SNS message type: {0:?}")]
    UnknownMessageType(String),
    #[error("invalid signing certificate URL {url:?}: {source}")]
    InvalidCertUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unacceptable signing certificate URL: {0}")]
    UnacceptableCertUrl(String),
    #[error("failed to fetch signing certificate from {url}: {source}")]
    CertFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid signing certificate: {0}")]
    InvalidCertificate(String),
    #[error("unsupported signature version: {0:?}")]
    UnsupportedSignatureVersion(String),
    #[error("failed to decode signature: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),
    #[error("signature mismatch")]
    SignatureMismatch,
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// Scheme name used in logs.
    fn scheme(&self) -> &'static str;

    /// Inspect the request and return verified evidence, `None` when the
    /// request is not addressed to this scheme (or verification soft-failed).
    async fn inspect(&self, req: &InboundRequest) -> Result<Option<Evidence>, VerifyError>;
}
