use std::sync::Arc;

use tracing::debug;

use super::{
    InboundRequest, VerifyError, Verifier,
    jwks::{HttpJwksSource, JwksSource},
    oidc::{OidcIssuer, OidcVerifier},
    sns::{CertificateSource, HttpCertificateSource, SnsVerifier},
    webhook::GitHubWebhookVerifier,
};
use crate::config::AuthConfig;
use crate::model::AuthContext;

/// Ordered list of configured verifiers.
pub struct VerifierChain {
    verifiers: Vec<Box<dyn Verifier>>,
}

impl std::fmt::Debug for VerifierChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schemes: Vec<&str> = self.verifiers.iter().map(|v| v.scheme()).collect();
        f.debug_struct("VerifierChain")
            .field("schemes", &schemes)
            .finish()
    }
}

impl VerifierChain {
    pub fn new(verifiers: Vec<Box<dyn Verifier>>) -> Self {
        Self { verifiers }
    }

    /// Build the chain from configuration, sharing one HTTP client across the
    /// key-set and certificate fetchers.
    pub fn from_config(config: &AuthConfig, http: reqwest::Client) -> Self {
        let jwks: Arc<dyn JwksSource> = Arc::new(HttpJwksSource::new(http.clone()));
        let certs: Arc<dyn CertificateSource> = Arc::new(HttpCertificateSource::new(http));

        Self::with_sources(config, jwks, certs)
    }

    pub fn with_sources(
        config: &AuthConfig,
        jwks: Arc<dyn JwksSource>,
        certs: Arc<dyn CertificateSource>,
    ) -> Self {
        let mut verifiers: Vec<Box<dyn Verifier>> = Vec::new();

        if !config.github_secrets.is_empty() {
            verifiers.push(Box::new(GitHubWebhookVerifier::new(
                config.github_secrets.clone(),
            )));
        }
        if config.github_action_token {
            verifiers.push(Box::new(OidcVerifier::new(
                OidcIssuer::GitHubActions,
                jwks.clone(),
            )));
        }
        if config.google_id_token {
            verifiers.push(Box::new(OidcVerifier::new(OidcIssuer::Google, jwks)));
        }
        if config.aws_sns {
            verifiers.push(Box::new(SnsVerifier::new(certs)));
        }

        Self::new(verifiers)
    }

    pub fn schemes(&self) -> Vec<&'static str> {
        self.verifiers.iter().map(|v| v.scheme()).collect()
    }

    /// Run every verifier in order and aggregate the evidence.
    pub async fn authenticate(&self, req: &InboundRequest) -> Result<AuthContext, VerifyError> {
        let mut evidence = Vec::with_capacity(self.verifiers.len());

        for verifier in &self.verifiers {
            if let Some(found) = verifier.inspect(req).await? {
                debug!(scheme = verifier.scheme(), "authentication evidence attached");
                evidence.push(found);
            }
        }

        let ctx = AuthContext::from_evidence(evidence);
        if ctx.is_empty() {
            debug!("no authentication evidence");
        }
        Ok(ctx)
    }
}
