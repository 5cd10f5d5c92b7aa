//! Policy engine access behind a narrow `query(name, input) -> output` interface.
//!
//! The engine itself is a black box: local Rego files evaluated in-process
//! (`RegoPolicy`) or a remote OPA server (`OpaHttpPolicy`). Both return the raw
//! JSON document for the query; undefined results come back as `{}`.

pub mod opa;
pub mod rego;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub use opa::OpaHttpPolicy;
pub use rego::RegoPolicy;

/// Rule path of the authorization query.
pub const AUTH_QUERY: &str = "data.auth";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to load policy {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("no policy files found in {0}")]
    NoPolicies(String),
    #[error("policy query {query} failed: {reason}")]
    Eval { query: String, reason: String },
    #[error("policy query {query} failed: {source}")]
    Remote {
        query: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid policy input: {0}")]
    Input(#[source] serde_json::Error),
    #[error("unexpected output of policy query {query}: {source}")]
    Output {
        query: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn query(
        &self,
        query: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, PolicyError>;
}

/// Typed convenience over [`PolicyClient::query`].
pub async fn query_as<I, O>(
    policy: &dyn PolicyClient,
    query: &str,
    input: &I,
) -> Result<O, PolicyError>
where
    I: Serialize + ?Sized,
    O: DeserializeOwned,
{
    let input = serde_json::to_value(input).map_err(PolicyError::Input)?;
    let output = policy.query(query, &input).await?;
    serde_json::from_value(output).map_err(|source| PolicyError::Output {
        query: query.to_string(),
        source,
    })
}

/// Treat an undefined (null) result as the empty document.
pub(crate) fn defined_or_empty(value: serde_json::Value) -> serde_json::Value {
    if value.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        value
    }
}
