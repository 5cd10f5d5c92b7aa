//! Verified authentication evidence and the aggregated per-request context.
//!
//! Each verifier produces at most one [`Evidence`]; [`AuthContext::from_evidence`]
//! folds them into one slot per scheme. The JSON shape of `AuthContext` is part of
//! the policy contract (`input.auth`).

use axum::http::HeaderMap;
use serde::Serialize;

/// Claims of a verified OIDC token, kept as arbitrary JSON.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// GitHub webhook delivery metadata, taken from headers once the body signature matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitHubAppAuth {
    pub delivery: String,
    pub event: String,
    pub hook_id: i64,
    pub install_id: i64,
    pub install_type: String,
}

impl GitHubAppAuth {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        // Unparseable ids degrade to 0
        let number = |name: &str| text(name).trim().parse::<i64>().unwrap_or(0);

        Self {
            delivery: text("x-github-delivery"),
            event: text("x-github-event"),
            hook_id: number("x-github-hook-id"),
            install_id: number("x-github-hook-installation-target-id"),
            install_type: text("x-github-hook-installation-target-type"),
        }
    }
}

/// Amazon SNS envelope fields, populated only after the signature verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AwsSnsAuth {
    #[serde(rename = "Type")]
    pub message_type: String,
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "TopicArn")]
    pub topic_arn: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

/// Output of a single verifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    GitHubApp(GitHubAppAuth),
    GitHubAction(Claims),
    Google(Claims),
    AwsSns(AwsSnsAuth),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GitHubAuth {
    pub app: Option<GitHubAppAuth>,
    pub action: Option<Claims>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwsAuth {
    pub sns: Option<AwsSnsAuth>,
}

/// Aggregated evidence for one request. Built once, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthContext {
    pub github: GitHubAuth,
    pub google: Option<Claims>,
    pub aws: AwsAuth,
}

impl AuthContext {
    pub fn from_evidence<I>(evidence: I) -> Self
    where
        I: IntoIterator<Item = Evidence>,
    {
        let mut ctx = Self::default();
        for item in evidence {
            match item {
                Evidence::GitHubApp(app) => ctx.github.app = Some(app),
                Evidence::GitHubAction(claims) => ctx.github.action = Some(claims),
                Evidence::Google(claims) => ctx.google = Some(claims),
                Evidence::AwsSns(sns) => ctx.aws.sns = Some(sns),
            }
        }
        ctx
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
