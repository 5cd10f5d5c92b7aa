//! Outbound chat notifications.
//!
//! `render` turns a policy-produced [`Message`](crate::model::Message) into a
//! `chat.postMessage` payload; `slack` sends it.

pub mod render;
pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

pub use render::PostMessage;
pub use slack::SlackClient;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(&self, message: &PostMessage) -> Result<(), ChatError>;
}
