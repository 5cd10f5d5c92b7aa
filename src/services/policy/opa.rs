use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{PolicyClient, PolicyError, defined_or_empty};

/// Remote OPA server via the data API: `POST /v1/data/<path>`.
#[derive(Debug, Clone)]
pub struct OpaHttpPolicy {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    result: serde_json::Value,
}

impl OpaHttpPolicy {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// `data.msg.a.b` -> `{base}/v1/data/msg/a/b`
    pub fn endpoint(&self, query: &str) -> Result<Url, PolicyError> {
        let path = query.strip_prefix("data").unwrap_or(query);
        let path = path.trim_start_matches('.').replace('.', "/");
        let base = self.base_url.as_str().trim_end_matches('/');

        Url::parse(&format!("{base}/v1/data/{path}")).map_err(|e| PolicyError::Eval {
            query: query.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PolicyClient for OpaHttpPolicy {
    async fn query(
        &self,
        query: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, PolicyError> {
        let remote_err = |source| PolicyError::Remote {
            query: query.to_string(),
            source,
        };

        let resp = self
            .client
            .post(self.endpoint(query)?)
            .json(&json!({ "input": input }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(remote_err)?;

        let data: DataResponse = resp.json().await.map_err(remote_err)?;
        Ok(defined_or_empty(data.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_names_map_to_data_api_paths() {
        let opa = OpaHttpPolicy::new(
            reqwest::Client::new(),
            Url::parse("http://localhost:8181/").unwrap(),
        );
        assert_eq!(
            opa.endpoint("data.auth").unwrap().as_str(),
            "http://localhost:8181/v1/data/auth"
        );
        assert_eq!(
            opa.endpoint("data.msg.a.b").unwrap().as_str(),
            "http://localhost:8181/v1/data/msg/a/b"
        );
    }
}
