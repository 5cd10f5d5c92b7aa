use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ChatClient, ChatError, PostMessage};
use crate::config::Secret;

pub const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    token: Secret,
    endpoint: String,
}

impl SlackClient {
    pub fn new(client: reqwest::Client, token: Secret) -> Self {
        Self {
            client,
            token,
            endpoint: POST_MESSAGE_URL.to_string(),
        }
    }
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl ApiResponse {
    fn into_result(self) -> Result<(), ChatError> {
        if self.ok {
            Ok(())
        } else {
            Err(ChatError::Api(
                self.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, message: &PostMessage) -> Result<(), ChatError> {
        debug!(channel = %message.channel, "posting chat message");

        let response: ApiResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()
    }
}
